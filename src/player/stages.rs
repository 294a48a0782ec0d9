use crate::core::{AudioBuffer, Result, StreamKind, VideoFrame};
use std::time::Duration;

/// 解封装数据源
///
/// 每次调用恰好推进一个数据包；`Ok(None)` 表示到达文件末尾。
/// 不支持 seek，也不支持 peek。
pub trait PacketSource {
    type Packet;

    fn next_packet(&mut self) -> Result<Option<(StreamKind, Self::Packet)>>;
}

/// 流解码器（视频/音频共用）
///
/// 一个包可能产出 0..n 帧，因此每次 `submit` 之后都要循环调用 `receive`
/// 直到返回 `Ok(None)`。
pub trait StreamDecoder {
    type Packet;
    type Frame;

    /// 送入一个压缩包；包损坏时返回 `DecodeError`（可恢复）
    fn submit(&mut self, packet: &Self::Packet) -> Result<()>;

    /// 送入流结束标记，之后 `receive` 会吐出所有缓冲帧
    fn submit_eof(&mut self) -> Result<()>;

    /// 取一帧；`Ok(None)` 表示需要更多数据包（或已排空）
    fn receive(&mut self) -> Result<Option<Self::Frame>>;
}

/// 帧格式转换（像素格式 / 采样格式）
pub trait FrameConverter {
    type Input;
    type Output;

    fn convert(&mut self, frame: &Self::Input) -> Result<Self::Output>;

    /// 取出转换器内部缓冲的剩余数据（重采样延迟）
    fn drain(&mut self) -> Result<Option<Self::Output>> {
        Ok(None)
    }
}

/// 呈现端：视频显示面 + 音频输出队列
pub trait PresentationSink {
    fn present_video(&mut self, frame: &VideoFrame) -> Result<()>;

    /// 追加 PCM，立即返回，由设备自行持续消费
    fn queue_audio(&mut self, buffer: &AudioBuffer) -> Result<()>;

    /// 已入队但设备尚未播放的音频时长
    fn pending_audio(&self) -> Duration {
        Duration::ZERO
    }
}
