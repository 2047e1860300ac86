//! Parameter signatures: a CRC32 chain over the parameter's naming and shape, so the sensor can
//! reject instructions built against a different parameter table.

use crate::checksum::{
    Checksum,
    SignatureCrc,
};

use super::Detail;

/// CRC32 over `text` with every byte widened to a big-endian u16.
pub fn signature_crc(text: &str) -> u32 {
    let widened = text.bytes().flat_map(|b| [0, b]).collect::<Vec<_>>();

    SignatureCrc::checksum(&widened)
}

fn section_crc(section_name: &str, section_id: u16, dim_count: u8) -> u32 {
    signature_crc(&format!("{section_name}{section_id}{dim_count}"))
}

/// A named array dimension and its element count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dimension<'a> {
    pub name:     &'a str,
    pub elements: u32,
}

impl<'a> Dimension<'a> {
    pub const fn new(name: &'a str, elements: u32) -> Self {
        Self { name, elements }
    }
}

/// Signature of a scalar parameter.
pub fn scalar_signature(detail: &Detail, section_name: &str, parameter_name: &str) -> u32 {
    let step1 = section_crc(section_name, detail.section_id, detail.dim_count);

    signature_crc(&format!(
        "{parameter_name}{}{}{step1}{}",
        detail.parameter_id,
        detail.data_type.type_name(),
        detail.dim_count,
    ))
}

/// Signature of an array parameter with one or two dimensions.
pub fn array_signature(
    detail: &Detail,
    section_name: &str,
    parameter_name: &str,
    dims: &[Dimension<'_>],
) -> u32 {
    let step1 = section_crc(section_name, detail.section_id, detail.dim_count);

    let dim_text = dims
        .iter()
        .map(|d| format!("{}{}", d.name, d.elements))
        .collect::<String>();
    let dim_crc = signature_crc(&dim_text);

    signature_crc(&format!(
        "{parameter_name}{}{}{step1}{dim_crc}",
        detail.parameter_id,
        detail.data_type.type_name(),
    ))
}

impl Detail {
    pub fn sign(&mut self, section_name: &str, parameter_name: &str) {
        self.signature = scalar_signature(self, section_name, parameter_name);
    }

    pub fn sign_1dim(&mut self, section_name: &str, parameter_name: &str, dim: Dimension<'_>) {
        self.signature = array_signature(self, section_name, parameter_name, &[dim]);
    }

    pub fn sign_2dim(
        &mut self,
        section_name: &str,
        parameter_name: &str,
        dim1: Dimension<'_>,
        dim2: Dimension<'_>,
    ) {
        self.signature = array_signature(self, section_name, parameter_name, &[dim1, dim2]);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::{
        DataType,
        RequestType,
    };

    fn widened_crc(text: &str) -> u32 {
        let mut bytes = vec![];
        for b in text.bytes() {
            bytes.push(0);
            bytes.push(b);
        }

        crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(&bytes)
    }

    #[test]
    fn widening() {
        assert_eq!(signature_crc(""), 0);
        assert_eq!(signature_crc("abc"), widened_crc("abc"));
        assert_ne!(signature_crc("abc"), SignatureCrc::checksum(b"abc"));
    }

    #[test]
    fn scalar_chain() {
        let mut detail = Detail::new(RequestType::SetParameter, 2010, 3);
        detail.data_type = DataType::F32;
        detail.sign("comm", "baudrate");

        let step1 = widened_crc("comm20100");
        let expected = widened_crc(&format!("baudrate3f32{step1}0"));

        assert_eq!(detail.signature, expected);
    }

    #[test]
    fn dimension_chain() {
        let mut detail = Detail::new(RequestType::GetParameter, 7, 11);
        detail.data_type = DataType::U16;
        detail.dim_count = 2;
        detail.sign_2dim("zones", "limits", Dimension::new("zone", 4), Dimension::new("lane", 8));

        let step1 = widened_crc("zones72");
        let dims = widened_crc("zone4lane8");
        let expected = widened_crc(&format!("limits11u16{step1}{dims}"));

        assert_eq!(detail.signature, expected);

        let two = detail.signature;
        detail.sign_1dim("zones", "limits", Dimension::new("zone", 4));
        assert_ne!(detail.signature, two);
    }

    #[test]
    fn untyped_parameters_hash_as_unknown() {
        let mut typed = Detail::new(RequestType::Command, 1, 1);
        typed.data_type = DataType::Unknown(200);
        typed.sign("s", "p");

        let mut none = typed;
        none.data_type = DataType::None;
        none.sign("s", "p");

        assert_eq!(typed.signature, none.signature);
    }
}
