use crate::core::{
    AudioBuffer, MediaInfo, PlaybackState, PlayerConfig, PlayerError, Result, SharedStatus,
    StreamKind, TransportCommand, VideoFrame,
};
use crate::player::audio_output::AudioOutput;
use crate::player::converter::{PixelConverter, Resampler};
use crate::player::decoder::{AudioDecoder, VideoDecoder};
use crate::player::demuxer::Demuxer;
use crate::player::stages::PresentationSink;
use crate::player::synchronizer::{Pipeline, PlaybackReport, Synchronizer};
use crate::renderer::VideoSurface;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::process;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn get_thread_info() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

/// 真实的呈现端：视频写入显示面，音频推入设备队列
pub struct OutputSink {
    surface: VideoSurface,
    audio: AudioOutput,
}

impl PresentationSink for OutputSink {
    fn present_video(&mut self, frame: &VideoFrame) -> Result<()> {
        self.surface.publish(frame);
        Ok(())
    }

    fn queue_audio(&mut self, buffer: &AudioBuffer) -> Result<()> {
        check_sample_rate(buffer.sample_rate, self.audio.sample_rate())?;
        self.audio.write_buffer(buffer);
        Ok(())
    }

    fn pending_audio(&self) -> Duration {
        queued_duration(self.audio.buffered_samples(), self.audio.sample_rate())
    }
}

/// 重采样输出必须和设备打开时的采样率一致
fn check_sample_rate(buffer_rate: u32, device_rate: u32) -> Result<()> {
    if buffer_rate != device_rate {
        return Err(PlayerError::OutputDeviceError(format!(
            "采样率不匹配: {} Hz / 设备 {} Hz",
            buffer_rate, device_rate
        )));
    }
    Ok(())
}

/// 交错立体声采样数 → 播放时长
fn queued_duration(interleaved_samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let frames = interleaved_samples / AudioBuffer::CHANNELS;
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

type MediaSynchronizer =
    Synchronizer<Demuxer, VideoDecoder, PixelConverter, AudioDecoder, Resampler, OutputSink>;

/// 一次播放会话
///
/// FFmpeg 和 cpal 的对象都不能跨线程移动，所以整条流水线在
/// "playback" 线程内部创建并运行。初始化结果通过握手通道先返回，
/// 调用方据此决定是否打开窗口；窗口就绪后再通过开始信号放行，
/// 在此之前不读取任何数据包。
pub struct PlaybackSession {
    commands: Sender<TransportCommand>,
    start: Sender<()>,
    status: SharedStatus,
    surface: VideoSurface,
    media_info: MediaInfo,
    handle: Option<JoinHandle<Result<PlaybackReport>>>,
}

impl PlaybackSession {
    /// 打开媒体并启动播放线程；任何初始化失败都在这里返回
    pub fn start(config: &PlayerConfig) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<MediaInfo>>(1);
        let (start_tx, start_rx) = bounded::<()>(1);
        let status = SharedStatus::new();
        let surface = VideoSurface::new();

        let thread_config = config.clone();
        let thread_status = status.clone();
        let thread_surface = surface.clone();

        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                info!("{} 🎬 播放线程启动", get_thread_info());
                let mut synchronizer = match build_pipeline(
                    &thread_config,
                    thread_surface,
                    command_rx,
                    thread_status.clone(),
                ) {
                    Ok((synchronizer, media_info)) => {
                        let _ = ready_tx.send(Ok(media_info));
                        synchronizer
                    }
                    Err(e) => {
                        thread_status.set_state(PlaybackState::Stopped);
                        // 错误本身已经交给调用方
                        let _ = ready_tx.send(Err(e));
                        return Ok(PlaybackReport::default());
                    }
                };

                let result = synchronizer.run_when_started(&start_rx);
                info!("{} 🛑 播放线程退出", get_thread_info());
                result
            })?;

        let media_info = match ready_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => return Err(join_failure(handle)),
        };

        Ok(Self {
            commands: command_tx,
            start: start_tx,
            status,
            surface,
            media_info,
            handle: Some(handle),
        })
    }

    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    pub fn surface(&self) -> VideoSurface {
        self.surface.clone()
    }

    pub fn commands(&self) -> Sender<TransportCommand> {
        self.commands.clone()
    }

    /// 开始信号，窗口和渲染器创建完成后发送一次
    pub fn start_signal(&self) -> Sender<()> {
        self.start.clone()
    }

    /// 请求退出（播放线程已结束时忽略）
    pub fn quit(&self) {
        let _ = self.commands.send(TransportCommand::Quit);
    }

    /// 等待播放线程结束并取回统计
    pub fn wait(mut self) -> Result<PlaybackReport> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| Err(thread_panicked())),
            None => Ok(PlaybackReport::default()),
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.quit();
            if handle.join().is_err() {
                error!("❌ 播放线程异常退出");
            }
        }
    }
}

/// 在播放线程内打开文件、创建解码器/转换器/音频设备
fn build_pipeline(
    config: &PlayerConfig,
    surface: VideoSurface,
    commands: Receiver<TransportCommand>,
    status: SharedStatus,
) -> Result<(MediaSynchronizer, MediaInfo)> {
    let demuxer = Demuxer::open(&config.media_path)?;
    info!("✅ {}", demuxer.description());

    let video_decoder = VideoDecoder::from_stream(demuxer.video_stream()?)?;
    let audio_decoder = AudioDecoder::from_stream(demuxer.audio_stream()?)?;

    let pixel_converter = PixelConverter::new(
        video_decoder.format(),
        video_decoder.width(),
        video_decoder.height(),
    )?;

    info!("🔧 初始化音频重采样器");
    let resampler = Resampler::new(
        audio_decoder.format(),
        audio_decoder.channel_layout(),
        audio_decoder.rate(),
    )?;

    let mut audio = AudioOutput::new(audio_decoder.rate())?;
    audio.start()?;

    let media_info = MediaInfo {
        path: config.media_path.display().to_string(),
        duration_ms: demuxer.duration_ms(),
        width: video_decoder.width(),
        height: video_decoder.height(),
        frame_rate: demuxer.frame_rate(),
        video_codec: demuxer.codec_name(StreamKind::Video),
        audio_codec: demuxer.codec_name(StreamKind::Audio),
        sample_rate: audio_decoder.rate(),
        channels: audio_decoder.channels(),
    };
    match serde_json::to_string(&media_info) {
        Ok(json) => debug!("媒体信息: {}", json),
        Err(e) => warn!("⚠️  媒体信息序列化失败: {}", e),
    }

    let time_base = demuxer.video_time_base()?;
    let pipeline = Pipeline {
        source: demuxer,
        video_decoder,
        pixel_converter,
        audio_decoder,
        resampler,
    };
    let sink = OutputSink { surface, audio };

    let synchronizer = Synchronizer::new(pipeline, sink, time_base, commands, status)
        .with_late_policy(config.late_frame_policy);

    Ok((synchronizer, media_info))
}

fn thread_panicked() -> PlayerError {
    PlayerError::ThreadError(std::io::Error::new(
        std::io::ErrorKind::Other,
        "播放线程异常退出",
    ))
}

fn join_failure(handle: JoinHandle<Result<PlaybackReport>>) -> PlayerError {
    match handle.join() {
        Ok(Err(e)) => e,
        _ => thread_panicked(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_before_window() {
        ffmpeg_next::init().unwrap();
        let config = PlayerConfig::new("/nonexistent/clip.mp4");
        let err = PlaybackSession::start(&config).err().unwrap();
        assert!(matches!(err, PlayerError::OpenError(_)));
    }

    #[test]
    fn test_queued_duration_counts_stereo_frames() {
        assert_eq!(queued_duration(96_000, 48_000), Duration::from_secs(1));
        assert_eq!(queued_duration(4_410, 44_100), Duration::from_millis(50));
        assert_eq!(queued_duration(1_000, 0), Duration::ZERO);
    }

    #[test]
    fn test_mismatched_sample_rate_is_device_error() {
        assert!(check_sample_rate(44_100, 44_100).is_ok());
        let err = check_sample_rate(48_000, 44_100).unwrap_err();
        assert!(matches!(err, PlayerError::OutputDeviceError(_)));
    }
}
