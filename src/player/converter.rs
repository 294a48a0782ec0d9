use crate::core::{AudioBuffer, PlayerError, Result, VideoFrame};
use crate::player::stages::FrameConverter;
use ffmpeg_next::software;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::{sample, Pixel, Sample};
use ffmpeg_next::util::frame;
use log::debug;

/// 目标采样格式：交错 s16
const TARGET_SAMPLE: Sample = Sample::I16(sample::Type::Packed);

/// 输出缓冲在“输入采样数 + 重采样延迟”之外的余量
const RESAMPLE_HEADROOM: usize = 32;

fn conversion_error(what: &str, e: impl std::fmt::Display) -> PlayerError {
    PlayerError::ConversionError(format!("{}: {}", what, e))
}

/// 去掉行填充，把 stride 排列的平面拷成紧密排列
fn pack_rows(src: &[u8], stride: usize, row_bytes: usize, rows: usize, dst: &mut Vec<u8>) {
    dst.clear();
    dst.reserve(row_bytes * rows);
    for row in src.chunks(stride).take(rows) {
        dst.extend_from_slice(&row[..row_bytes]);
    }
}

/// 把 s16 packed 的字节流拆成采样
fn s16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_ne_bytes([b[0], b[1]]))
        .collect()
}

/// 像素格式转换器：任意解码格式 → RGB24，尺寸不变
pub struct PixelConverter {
    scaler: software::scaling::Context,
    // 复用的目标缓冲，每个转换器独占一份
    destination: frame::Video,
    width: u32,
    height: u32,
}

impl PixelConverter {
    pub fn new(format: Pixel, width: u32, height: u32) -> Result<Self> {
        let scaler = software::scaling::Context::get(
            format,
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| conversion_error("像素转换器", e))?;

        debug!("🔧 像素转换器: {:?} {}x{} → RGB24", format, width, height);

        Ok(Self {
            scaler,
            destination: frame::Video::new(Pixel::RGB24, width, height),
            width,
            height,
        })
    }

}

impl FrameConverter for PixelConverter {
    type Input = frame::Video;
    type Output = VideoFrame;

    fn convert(&mut self, frame: &frame::Video) -> Result<VideoFrame> {
        self.scaler
            .run(frame, &mut self.destination)
            .map_err(|e| conversion_error("像素转换", e))?;

        let row_bytes = self.width as usize * VideoFrame::BYTES_PER_PIXEL;
        let mut data = Vec::new();
        pack_rows(
            self.destination.data(0),
            self.destination.stride(0),
            row_bytes,
            self.height as usize,
            &mut data,
        );

        Ok(VideoFrame {
            pts: frame.timestamp().or_else(|| frame.pts()),
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// 重采样器：任意采样格式/声道布局 → s16 交错立体声，采样率不变
pub struct Resampler {
    context: software::resampling::Context,
    sample_rate: u32,
}

impl Resampler {
    pub fn new(format: Sample, layout: ChannelLayout, sample_rate: u32) -> Result<Self> {
        let context = software::resampling::Context::get(
            format,
            layout,
            sample_rate,
            TARGET_SAMPLE,
            ChannelLayout::STEREO,
            sample_rate,
        )
        .map_err(|e| conversion_error("重采样器", e))?;

        debug!(
            "🔧 初始化音频重采样器: {:?}/{:?}/{}Hz → s16/stereo/{}Hz",
            format, layout, sample_rate, sample_rate
        );

        Ok(Self {
            context,
            sample_rate,
        })
    }

    /// 重采样器内部缓冲的输出采样数
    pub fn delay(&self) -> usize {
        self.context
            .delay()
            .map(|d| d.output.max(0) as usize)
            .unwrap_or(0)
    }

    fn output_frame(&self, capacity: usize) -> frame::Audio {
        let mut out = frame::Audio::new(TARGET_SAMPLE, capacity, ChannelLayout::STEREO);
        out.set_rate(self.sample_rate);
        out
    }

    fn to_buffer(&self, out: &frame::Audio) -> AudioBuffer {
        let frames = out.samples();
        let bytes = frames * AudioBuffer::CHANNELS * std::mem::size_of::<i16>();
        AudioBuffer {
            sample_rate: self.sample_rate,
            samples: s16_samples(&out.data(0)[..bytes]),
        }
    }
}

impl FrameConverter for Resampler {
    type Input = frame::Audio;
    type Output = AudioBuffer;

    fn convert(&mut self, frame: &frame::Audio) -> Result<AudioBuffer> {
        // 输出采样数不只取决于输入，先查询延迟再分配目标缓冲
        let capacity = frame.samples() + self.delay() + RESAMPLE_HEADROOM;
        let mut out = self.output_frame(capacity);
        self.context
            .run(frame, &mut out)
            .map_err(|e| conversion_error("重采样", e))?;
        Ok(self.to_buffer(&out))
    }

    fn drain(&mut self) -> Result<Option<AudioBuffer>> {
        let delay = self.delay();
        if delay == 0 {
            return Ok(None);
        }
        let mut out = self.output_frame(delay + RESAMPLE_HEADROOM);
        self.context
            .flush(&mut out)
            .map_err(|e| conversion_error("重采样 flush", e))?;
        let buffer = self.to_buffer(&out);
        Ok((!buffer.is_empty()).then_some(buffer))
    }
}
