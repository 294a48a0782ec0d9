// 播放器核心模块

pub mod stages;
pub mod demuxer;
pub mod decoder;
pub mod converter;
pub mod audio_output;
pub mod synchronizer;
pub mod transport;
pub mod session;

#[cfg(test)]
mod testing;

pub use transport::TransportController;
pub use session::PlaybackSession;
