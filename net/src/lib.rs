pub use datagram::{
    DatagramBind,
    DatagramSender,
};

mod datagram;
