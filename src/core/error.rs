use thiserror::Error;

use crate::core::StreamKind;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("无法打开文件: {0}")]
    OpenError(String),

    #[error("无法找到{0}流")]
    StreamSelectionError(StreamKind),

    #[error("解码器初始化失败: {0}")]
    DecoderInitError(String),

    /// 单个数据包损坏，跳过即可
    #[error("解码错误: {0}")]
    DecodeError(String),

    #[error("格式转换初始化失败: {0}")]
    ConversionError(String),

    #[error("读取错误: {0}")]
    IoError(String),

    #[error("输出设备错误: {0}")]
    OutputDeviceError(String),

    #[error("播放线程错误: {0}")]
    ThreadError(#[from] std::io::Error),
}

impl PlayerError {
    /// 只有单包解码错误是可恢复的，其余一律终止播放
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlayerError::DecodeError(_))
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
