pub use ::tokio_util::codec as tokio_codec;

mod datagram;
mod instruction;

pub use self::{
    datagram::DatagramCodec,
    instruction::{
        Error,
        InstructionCodec,
    },
};
