pub mod demux;
pub mod encode;
pub mod frame;
pub mod probe;
pub mod source;
