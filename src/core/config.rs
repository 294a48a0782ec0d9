use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// 控制条默认高度（逻辑像素）
pub const DEFAULT_CONTROL_STRIP_HEIGHT: f32 = 50.0;

const ENV_DROP_LATE_MS: &str = "PLAYER_DROP_LATE_MS";
const ENV_CONTROL_STRIP: &str = "PLAYER_CONTROL_STRIP";

/// 迟到帧处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LateFramePolicy {
    /// 迟到的帧立即显示，不跳帧
    #[default]
    PresentAll,
    /// 超过阈值的迟到帧直接丢弃
    DropLaterThan(Duration),
}

/// 播放器运行参数
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub media_path: PathBuf,
    pub late_frame_policy: LateFramePolicy,
    /// 为 0 表示不保留控制条
    pub control_strip_height: f32,
}

impl PlayerConfig {
    pub fn new(media_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: media_path.into(),
            late_frame_policy: LateFramePolicy::default(),
            control_strip_height: DEFAULT_CONTROL_STRIP_HEIGHT,
        }
    }

    /// 从环境变量读取可选参数
    pub fn from_env(media_path: impl Into<PathBuf>) -> Self {
        let drop_late = std::env::var(ENV_DROP_LATE_MS).ok();
        let strip = std::env::var(ENV_CONTROL_STRIP).ok();
        Self::new(media_path).with_overrides(drop_late.as_deref(), strip.as_deref())
    }

    fn with_overrides(mut self, drop_late_ms: Option<&str>, control_strip: Option<&str>) -> Self {
        if let Some(raw) = drop_late_ms {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    self.late_frame_policy =
                        LateFramePolicy::DropLaterThan(Duration::from_millis(ms));
                }
                _ => warn!("⚠️  忽略无效的 {}={:?}", ENV_DROP_LATE_MS, raw),
            }
        }

        if let Some(raw) = control_strip {
            match raw.trim() {
                "0" | "off" | "false" => self.control_strip_height = 0.0,
                "1" | "on" | "true" => self.control_strip_height = DEFAULT_CONTROL_STRIP_HEIGHT,
                _ => warn!("⚠️  忽略无效的 {}={:?}", ENV_CONTROL_STRIP, raw),
            }
        }

        self
    }

    pub fn has_control_strip(&self) -> bool {
        self.control_strip_height > 0.0
    }
}
