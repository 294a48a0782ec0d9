use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 数据包所属的流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Video => write!(f, "视频"),
            StreamKind::Audio => write!(f, "音频"),
        }
    }
}

/// 时间基：流内 tick 到秒的换算系数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub num: i32,
    pub den: i32,
}

impl TimeBase {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// ticks → 秒
    pub fn seconds(&self, ticks: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        ticks as f64 * self.num as f64 / self.den as f64
    }

    /// ticks → Duration，负值按 0 处理；超出 Duration 表示范围时返回 None
    pub fn duration(&self, ticks: i64) -> Option<Duration> {
        let secs = self.seconds(ticks);
        if secs.is_nan() || secs <= 0.0 {
            return Some(Duration::ZERO);
        }
        Duration::try_from_secs_f64(secs).ok()
    }
}

impl From<ffmpeg_next::Rational> for TimeBase {
    fn from(r: ffmpeg_next::Rational) -> Self {
        Self::new(r.numerator(), r.denominator())
    }
}

/// 转换后的视频帧（RGB24，紧密排列，无行填充）
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pts: Option<i64>,   // 显示时间戳（流时间基 tick）
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }
}

/// 转换后的音频缓冲（交错 s16 立体声）
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<i16>,  // L, R, L, R, ...
}

impl AudioBuffer {
    pub const CHANNELS: usize = 2;

    /// 每声道采样数
    pub fn frames(&self) -> usize {
        self.samples.len() / Self::CHANNELS
    }

    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// 播放状态（给 UI 看的粗粒度状态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// 传输控制命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Quit,
}

/// 窗口输入事件（坐标为逻辑像素）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiEvent {
    Quit,
    PointerDown { x: f32, y: f32 },
    TogglePlayback,
}

/// 媒体信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: String,
    pub duration_ms: i64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}
