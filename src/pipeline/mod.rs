// The streaming cycle: capture, detect, build, send.

pub mod frame_loop;
