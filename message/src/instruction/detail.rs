use std::fmt::{
    Display,
    Formatter,
};

use bytes::{
    Buf,
    BufMut,
};

use crate::{
    wire_enum::wire_enum,
    BodyOrder,
};

pub const DETAIL_LEN: usize = 24;

wire_enum! {
    pub enum RequestType: u8 {
        Invalid = 0 => "invalid",
        SetParameter = 1 => "set parameter",
        GetParameter = 2 => "get parameter",
        ReadStatus = 3 => "read status",
        Command = 4 => "command",
        ExportParamOrStatus = 5 => "export param",
    }
}

wire_enum! {
    pub enum ResponseType: u8 {
        NoInstruction = 0 => "no instruction",
        Success = 1 => "success",
        GeneralError = 2 => "general error",
        InvalidRequest = 3 => "invalid request",
        InvalidSection = 4 => "invalid section",
        InvalidId = 5 => "invalid id",
        InvalidProtection = 6 => "invalid protection",
        OutOfMinimalBounds = 7 => "out of minimal bounds",
        OutOfMaximalBounds = 8 => "out of maximal bounds",
        ValueIsNotANumber = 9 => "value is not a number",
        InvalidInstruction = 10 => "invalid instruction",
        InvalidDimension = 11 => "invalid dimension",
        InvalidElement = 12 => "invalid element",
        InvalidSignature = 13 => "invalid signature",
        InvalidAccessLevel = 14 => "invalid access level",
    }
}

wire_enum! {
    pub enum DataType: u8 {
        None = 0 => "none",
        I8 = 1 => "i8",
        U8 = 2 => "u8",
        I16 = 3 => "i16",
        U16 = 4 => "u16",
        I32 = 5 => "i32",
        U32 = 6 => "u32",
        F32 = 7 => "f32",
        U64 = 8 => "u64",
        F64 = 9 => "f64",
    }
}

impl DataType {
    /// Name hashed into parameter signatures.
    pub fn type_name(self) -> &'static str {
        match self {
            DataType::I8 => "i8",
            DataType::U8 => "u8",
            DataType::I16 => "i16",
            DataType::U16 => "u16",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::F32 => "f32",
            DataType::U64 => "u64",
            DataType::F64 => "f64",
            DataType::None | DataType::Unknown(_) => "unknown",
        }
    }
}

/// A typed parameter value. Written into the low bytes of the detail's 8-byte value field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    U64(u64),
    F64(f64),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::I8(_) => DataType::I8,
            Value::U8(_) => DataType::U8,
            Value::I16(_) => DataType::I16,
            Value::U16(_) => DataType::U16,
            Value::I32(_) => DataType::I32,
            Value::U32(_) => DataType::U32,
            Value::F32(_) => DataType::F32,
            Value::U64(_) => DataType::U64,
            Value::F64(_) => DataType::F64,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
        }
    }
}

/// One parameter operation within an instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Detail {
    pub request_type:  RequestType,
    pub response_type: ResponseType,
    pub section_id:    u16,
    pub parameter_id:  u16,
    pub data_type:     DataType,
    pub dim_count:     u8,
    pub element1:      u16,
    pub element2:      u16,
    pub signature:     u32,
    pub value:         [u8; 8],
}

impl Default for Detail {
    fn default() -> Self {
        Self {
            request_type:  RequestType::Invalid,
            response_type: ResponseType::NoInstruction,
            section_id:    0,
            parameter_id:  0,
            data_type:     DataType::None,
            dim_count:     0,
            element1:      0,
            element2:      0,
            signature:     0,
            value:         [0; 8],
        }
    }
}

impl Detail {
    pub fn new(request_type: RequestType, section_id: u16, parameter_id: u16) -> Self {
        Self {
            request_type,
            section_id,
            parameter_id,
            ..Default::default()
        }
    }

    pub(crate) fn read(buf: &mut impl Buf, order: BodyOrder) -> Self {
        let request_type = buf.get_u8().into();
        let response_type = buf.get_u8().into();
        let section_id = order.get_u16(buf);
        let parameter_id = order.get_u16(buf);
        let data_type = buf.get_u8().into();
        let dim_count = buf.get_u8();
        let element1 = order.get_u16(buf);
        let element2 = order.get_u16(buf);
        let signature = order.get_u32(buf);

        let mut value = [0; 8];
        buf.copy_to_slice(&mut value);

        Self {
            request_type,
            response_type,
            section_id,
            parameter_id,
            data_type,
            dim_count,
            element1,
            element2,
            signature,
            value,
        }
    }

    pub(crate) fn write(&self, buf: &mut impl BufMut, order: BodyOrder) {
        buf.put_u8(self.request_type.into());
        buf.put_u8(self.response_type.into());
        order.put_u16(buf, self.section_id);
        order.put_u16(buf, self.parameter_id);
        buf.put_u8(self.data_type.into());
        buf.put_u8(self.dim_count);
        order.put_u16(buf, self.element1);
        order.put_u16(buf, self.element2);
        order.put_u32(buf, self.signature);
        buf.put_slice(&self.value);
    }

    /// Interprets the value field according to `data_type`.
    pub fn value(&self, order: BodyOrder) -> Option<Value> {
        let mut v = &self.value[..];

        let result = match self.data_type {
            DataType::I8 => Value::I8(v.get_i8()),
            DataType::U8 => Value::U8(v.get_u8()),
            DataType::I16 => Value::I16(order.get_u16(&mut v) as i16),
            DataType::U16 => Value::U16(order.get_u16(&mut v)),
            DataType::I32 => Value::I32(order.get_u32(&mut v) as i32),
            DataType::U32 => Value::U32(order.get_u32(&mut v)),
            DataType::F32 => Value::F32(f32::from_bits(order.get_u32(&mut v))),
            DataType::U64 => Value::U64(order.get_u64(&mut v)),
            DataType::F64 => Value::F64(f64::from_bits(order.get_u64(&mut v))),
            DataType::None | DataType::Unknown(_) => return None,
        };

        Some(result)
    }

    /// Stores `value` and sets `data_type` to match. Unused value bytes are zeroed.
    pub fn set_value(&mut self, order: BodyOrder, value: Value) {
        self.value = [0; 8];
        self.data_type = value.data_type();

        let mut v = &mut self.value[..];

        match value {
            Value::I8(x) => v.put_i8(x),
            Value::U8(x) => v.put_u8(x),
            Value::I16(x) => order.put_u16(&mut v, x as u16),
            Value::U16(x) => order.put_u16(&mut v, x),
            Value::I32(x) => order.put_u32(&mut v, x as u32),
            Value::U32(x) => order.put_u32(&mut v, x),
            Value::F32(x) => order.put_u32(&mut v, x.to_bits()),
            Value::U64(x) => order.put_u64(&mut v, x),
            Value::F64(x) => order.put_u64(&mut v, x.to_bits()),
        }
    }
}
