use crate::core::{PlayerError, Result};
use crate::player::stages::StreamDecoder;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::error::EAGAIN;
use ffmpeg_next::{codec, format, util};
use log::debug;

fn init_error(kind: &str, e: ffmpeg::Error) -> PlayerError {
    PlayerError::DecoderInitError(format!("{}解码器: {}", kind, e))
}

fn decode_error(e: ffmpeg::Error) -> PlayerError {
    PlayerError::DecodeError(e.to_string())
}

/// receive_frame 的结果归一化：EAGAIN / EOF 都表示“暂时没有帧”
fn frame_ready(result: std::result::Result<(), ffmpeg::Error>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => Ok(false),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(e) => Err(decode_error(e)),
    }
}

/// send_eof 重复调用时 FFmpeg 会返回 EOF，这里视为成功
fn eof_sent(result: std::result::Result<(), ffmpeg::Error>) -> Result<()> {
    match result {
        Ok(()) | Err(ffmpeg::Error::Eof) => Ok(()),
        Err(e) => Err(decode_error(e)),
    }
}

/// 视频解码器（软件解码）
pub struct VideoDecoder {
    decoder: codec::decoder::Video,
}

impl VideoDecoder {
    pub fn from_stream(stream: format::stream::Stream) -> Result<Self> {
        let context = codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| init_error("视频", e))?;
        let decoder = context.decoder().video().map_err(|e| init_error("视频", e))?;

        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(PlayerError::DecoderInitError(format!(
                "视频尺寸无效: {}x{}",
                decoder.width(),
                decoder.height()
            )));
        }

        debug!(
            "视频解码器: {}x{}, 格式: {:?}",
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self { decoder })
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn format(&self) -> util::format::Pixel {
        self.decoder.format()
    }
}

impl StreamDecoder for VideoDecoder {
    type Packet = ffmpeg::Packet;
    type Frame = util::frame::Video;

    fn submit(&mut self, packet: &ffmpeg::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(decode_error)
    }

    fn submit_eof(&mut self) -> Result<()> {
        eof_sent(self.decoder.send_eof())
    }

    fn receive(&mut self) -> Result<Option<util::frame::Video>> {
        let mut frame = util::frame::Video::empty();
        if frame_ready(self.decoder.receive_frame(&mut frame))? {
            Ok(Some(frame))
        } else {
            Ok(None)
        }
    }
}

/// 音频解码器
pub struct AudioDecoder {
    decoder: codec::decoder::Audio,
    layout: util::channel_layout::ChannelLayout,
}

impl AudioDecoder {
    pub fn from_stream(stream: format::stream::Stream) -> Result<Self> {
        let context = codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| init_error("音频", e))?;
        let decoder = context.decoder().audio().map_err(|e| init_error("音频", e))?;

        if decoder.rate() == 0 || decoder.channels() == 0 {
            return Err(PlayerError::DecoderInitError(format!(
                "音频参数无效: {} Hz, {} 声道",
                decoder.rate(),
                decoder.channels()
            )));
        }

        let layout = normalized_layout(decoder.channel_layout(), decoder.channels());

        debug!(
            "音频解码器: {} Hz, {} 声道, 格式: {:?}",
            decoder.rate(),
            decoder.channels(),
            decoder.format()
        );

        Ok(Self { decoder, layout })
    }

    pub fn rate(&self) -> u32 {
        self.decoder.rate()
    }

    pub fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    pub fn format(&self) -> util::format::Sample {
        self.decoder.format()
    }

    pub fn channel_layout(&self) -> util::channel_layout::ChannelLayout {
        self.layout
    }
}

/// 部分编码器不给出声道布局，按声道数补上默认布局
fn normalized_layout(
    layout: util::channel_layout::ChannelLayout,
    channels: u16,
) -> util::channel_layout::ChannelLayout {
    if layout.is_empty() {
        util::channel_layout::ChannelLayout::default(channels as i32)
    } else {
        layout
    }
}

impl StreamDecoder for AudioDecoder {
    type Packet = ffmpeg::Packet;
    type Frame = util::frame::Audio;

    fn submit(&mut self, packet: &ffmpeg::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(decode_error)
    }

    fn submit_eof(&mut self) -> Result<()> {
        eof_sent(self.decoder.send_eof())
    }

    fn receive(&mut self) -> Result<Option<util::frame::Audio>> {
        let mut frame = util::frame::Audio::empty();
        if !frame_ready(self.decoder.receive_frame(&mut frame))? {
            return Ok(None);
        }
        // 重采样器按解码器布局配置，帧布局必须一致
        if frame.channel_layout().is_empty() {
            frame.set_channel_layout(self.layout);
        }
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use util::channel_layout::ChannelLayout;

    #[test]
    fn test_receive_result_mapping() {
        assert!(frame_ready(Ok(())).unwrap());
        assert!(!frame_ready(Err(ffmpeg::Error::Eof)).unwrap());
        assert!(!frame_ready(Err(ffmpeg::Error::Other { errno: EAGAIN })).unwrap());

        let err = frame_ready(Err(ffmpeg::Error::InvalidData)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_repeated_eof_is_not_an_error() {
        assert!(eof_sent(Err(ffmpeg::Error::Eof)).is_ok());
        assert!(eof_sent(Err(ffmpeg::Error::InvalidData)).is_err());
    }

    #[test]
    fn test_missing_layout_falls_back_to_default() {
        assert_eq!(normalized_layout(ChannelLayout::empty(), 2), ChannelLayout::STEREO);
        assert_eq!(
            normalized_layout(ChannelLayout::MONO, 1),
            ChannelLayout::MONO
        );
    }
}
