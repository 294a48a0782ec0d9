use crate::core::{PlayerError, Result, StreamKind, TimeBase};
use crate::player::stages::PacketSource;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media};
use log::{debug, info};
use std::path::Path;

/// 日志里只打印每个流的前几个包和之后每 100 个包
const LOG_FIRST_N: u64 = 5;

/// 选中的视频/音频流索引，播放开始后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSelection {
    pub video: usize,
    pub audio: usize,
}

impl StreamSelection {
    /// 两路流缺一不可
    pub fn resolve(video: Option<usize>, audio: Option<usize>) -> Result<Self> {
        let video = video.ok_or(PlayerError::StreamSelectionError(StreamKind::Video))?;
        let audio = audio.ok_or(PlayerError::StreamSelectionError(StreamKind::Audio))?;
        Ok(Self { video, audio })
    }

    pub fn kind_of(&self, stream_index: usize) -> Option<StreamKind> {
        if stream_index == self.video {
            Some(StreamKind::Video)
        } else if stream_index == self.audio {
            Some(StreamKind::Audio)
        } else {
            None
        }
    }
}

/// 解封装器 - 顺序读取容器里的数据包
pub struct Demuxer {
    input_ctx: format::context::Input,
    selection: StreamSelection,
    source_path: String,
    video_packets: u64,
    audio_packets: u64,
}

impl Demuxer {
    /// 打开媒体文件并选择视频/音频流
    pub fn open(path: &Path) -> Result<Self> {
        info!("正在打开文件: {}", path.display());

        let input_ctx = format::input(&path)
            .map_err(|e| PlayerError::OpenError(format!("{}: {}", path.display(), e)))?;

        let video = input_ctx
            .streams()
            .best(media::Type::Video)
            .map(|s| s.index());
        let audio = input_ctx
            .streams()
            .best(media::Type::Audio)
            .map(|s| s.index());

        debug!("视频流索引: {:?}", video);
        debug!("音频流索引: {:?}", audio);

        let selection = StreamSelection::resolve(video, audio)?;

        Ok(Self {
            input_ctx,
            selection,
            source_path: path.display().to_string(),
            video_packets: 0,
            audio_packets: 0,
        })
    }

    pub fn video_stream(&self) -> Result<format::stream::Stream<'_>> {
        self.input_ctx
            .stream(self.selection.video)
            .ok_or(PlayerError::StreamSelectionError(StreamKind::Video))
    }

    pub fn audio_stream(&self) -> Result<format::stream::Stream<'_>> {
        self.input_ctx
            .stream(self.selection.audio)
            .ok_or(PlayerError::StreamSelectionError(StreamKind::Audio))
    }

    pub fn video_time_base(&self) -> Result<TimeBase> {
        Ok(self.video_stream()?.time_base().into())
    }

    /// 总时长（毫秒），容器未给出时为 0
    pub fn duration_ms(&self) -> i64 {
        self.input_ctx.duration().max(0) / 1000
    }

    /// 视频平均帧率
    pub fn frame_rate(&self) -> f64 {
        self.video_stream()
            .map(|s| f64::from(s.avg_frame_rate()))
            .ok()
            .filter(|fps| fps.is_finite())
            .unwrap_or(0.0)
    }

    pub fn codec_name(&self, kind: StreamKind) -> String {
        let stream = match kind {
            StreamKind::Video => self.video_stream(),
            StreamKind::Audio => self.audio_stream(),
        };
        stream
            .map(|s| s.parameters().id().name().to_string())
            .unwrap_or_else(|_| "none".to_string())
    }

    pub fn description(&self) -> String {
        format!("FFmpeg Demuxer: {}", self.source_path)
    }

    fn count(&mut self, kind: StreamKind) {
        let n = match kind {
            StreamKind::Video => {
                self.video_packets += 1;
                self.video_packets
            }
            StreamKind::Audio => {
                self.audio_packets += 1;
                self.audio_packets
            }
        };
        if n <= LOG_FIRST_N || n % 100 == 0 {
            debug!("📦 读取{}包 #{}", kind, n);
        }
    }
}

impl PacketSource for Demuxer {
    type Packet = ffmpeg::Packet;

    fn next_packet(&mut self) -> Result<Option<(StreamKind, ffmpeg::Packet)>> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut self.input_ctx) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(e) => return Err(PlayerError::IoError(e.to_string())),
            }

            // 其他流的包直接丢弃（离开作用域即释放）
            if let Some(kind) = self.selection.kind_of(packet.stream()) {
                self.count(kind);
                return Ok(Some((kind, packet)));
            }
        }
    }
}
