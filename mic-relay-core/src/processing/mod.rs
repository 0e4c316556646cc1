pub mod byte_order;
pub mod ring_buffer;
pub mod sample_convert;
pub mod slotted_buffer;
