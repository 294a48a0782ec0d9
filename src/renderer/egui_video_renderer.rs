use egui::{Color32, Rect, TextureHandle, TextureOptions, Ui, Vec2};
use log::{debug, info};

use crate::renderer::surface::VideoSurface;

/// egui 视频渲染器 - 把显示面上的最新帧画进视频区域
pub struct EguiVideoRenderer {
    surface: VideoSurface,
    texture: Option<TextureHandle>,
    /// 已上传到纹理的帧序号
    uploaded: u64,
    frame_size: [usize; 2],
    texture_updates: u64,
}

impl EguiVideoRenderer {
    pub fn new(surface: VideoSurface) -> Self {
        info!("🎨 初始化 EguiVideoRenderer");
        Self {
            surface,
            texture: None,
            uploaded: 0,
            frame_size: [0, 0],
            texture_updates: 0,
        }
    }

    /// 有新帧时更新纹理，然后按原始宽高比居中绘制
    pub fn update_and_render(&mut self, ui: &mut Ui, rect: Rect) {
        self.upload_pending(ui.ctx());

        ui.painter().rect_filled(rect, 0.0, Color32::BLACK);

        if let Some(texture) = &self.texture {
            let display = fit_rect(rect, self.frame_size);
            ui.painter().image(
                texture.id(),
                display,
                Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }

    fn upload_pending(&mut self, ctx: &egui::Context) {
        let Some((sequence, image)) = self.surface.image_since(self.uploaded) else {
            return;
        };

        if image.size != self.frame_size {
            debug!("🆕 视频纹理尺寸: {}x{}", image.size[0], image.size[1]);
        }
        self.frame_size = image.size;

        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("video_frame", image, TextureOptions::LINEAR));
            }
        }
        self.uploaded = sequence;
        self.texture_updates += 1;
    }

    pub fn texture_updates(&self) -> u64 {
        self.texture_updates
    }
}

/// 在 `area` 内保持宽高比居中
fn fit_rect(area: Rect, frame_size: [usize; 2]) -> Rect {
    let [width, height] = frame_size;
    if width == 0 || height == 0 || area.height() <= 0.0 {
        return area;
    }

    let video_aspect = width as f32 / height as f32;
    let area_aspect = area.width() / area.height();

    let size = if video_aspect > area_aspect {
        Vec2::new(area.width(), area.width() / video_aspect)
    } else {
        Vec2::new(area.height() * video_aspect, area.height())
    };

    Rect::from_center_size(area.center(), size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn test_fit_rect_matches_exact_window() {
        let area = Rect::from_min_size(pos2(0.0, 0.0), Vec2::new(640.0, 360.0));
        assert_eq!(fit_rect(area, [640, 360]), area);
    }

    #[test]
    fn test_fit_rect_letterboxes_wide_video() {
        let area = Rect::from_min_size(pos2(0.0, 0.0), Vec2::new(400.0, 400.0));
        let fitted = fit_rect(area, [800, 400]);
        assert_eq!(fitted.width(), 400.0);
        assert_eq!(fitted.height(), 200.0);
        assert_eq!(fitted.center(), area.center());
    }

    #[test]
    fn test_fit_rect_without_frame_keeps_area() {
        let area = Rect::from_min_size(pos2(0.0, 0.0), Vec2::new(100.0, 50.0));
        assert_eq!(fit_rect(area, [0, 0]), area);
    }
}
