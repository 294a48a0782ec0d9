use crate::core::VideoFrame;
use egui::ColorImage;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct SurfaceSlot {
    frame: Option<VideoFrame>,
    sequence: u64,
    repaint: Option<egui::Context>,
}

/// 视频显示面 - 播放线程写入最新一帧，UI 线程读取
///
/// 只保留最后一帧；UI 线程用序号判断是否需要重新上传纹理。
#[derive(Clone, Default)]
pub struct VideoSurface {
    inner: Arc<Mutex<SurfaceSlot>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 窗口创建后登记 egui 上下文，之后每次写入都会请求重绘
    pub fn attach_context(&self, ctx: egui::Context) {
        self.inner.lock().repaint = Some(ctx);
    }

    /// 替换当前帧；复用已有缓冲区，避免每帧重新分配
    pub fn publish(&self, frame: &VideoFrame) {
        let repaint = {
            let mut slot = self.inner.lock();
            match slot.frame.as_mut() {
                Some(current) => {
                    current.pts = frame.pts;
                    current.width = frame.width;
                    current.height = frame.height;
                    current.data.clone_from(&frame.data);
                }
                None => slot.frame = Some(frame.clone()),
            }
            slot.sequence += 1;
            slot.repaint.clone()
        };

        if let Some(ctx) = repaint {
            ctx.request_repaint();
        }
    }

    /// 比 `seen` 更新的帧转换成 egui 图像
    pub fn image_since(&self, seen: u64) -> Option<(u64, ColorImage)> {
        let slot = self.inner.lock();
        if slot.sequence <= seen {
            return None;
        }
        let frame = slot.frame.as_ref()?;
        if frame.data.len() != VideoFrame::expected_len(frame.width, frame.height) {
            return None;
        }
        let image = ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);
        Some((slot.sequence, image))
    }
}
