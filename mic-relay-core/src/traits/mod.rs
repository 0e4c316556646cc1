pub mod audio_input;
pub mod frame_store;
