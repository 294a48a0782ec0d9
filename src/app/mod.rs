use crossbeam_channel::Sender;
use egui::{Color32, Context, Event, Key, PointerButton, Pos2, Rect, Shape, Stroke, Ui};
use log::{debug, info};
use std::time::Duration;

use crate::core::{MediaInfo, PlaybackState, SharedStatus, TransportCommand, UiEvent};
use crate::player::TransportController;
use crate::renderer::{EguiVideoRenderer, VideoSurface};

const STRIP_BACKGROUND: Color32 = Color32::from_rgb(29, 29, 29);
const BUTTON_IDLE: Color32 = Color32::from_rgb(90, 90, 90);
const BUTTON_ACTIVE: Color32 = Color32::WHITE;

/// 播放窗口：视频区 + 可选的底部控制条
pub struct PlayerApp {
    commands: Sender<TransportCommand>,
    status: SharedStatus,
    media_info: MediaInfo,
    strip_height: f32,
    video_renderer: EguiVideoRenderer,
    /// 首帧时按窗口几何创建
    transport: Option<TransportController>,
    quit_sent: bool,
    closing: bool,
}

impl PlayerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        commands: Sender<TransportCommand>,
        status: SharedStatus,
        surface: VideoSurface,
        start: Sender<()>,
        media_info: MediaInfo,
        strip_height: f32,
    ) -> Self {
        info!("🎮 初始化 PlayerApp");
        surface.attach_context(cc.egui_ctx.clone());
        // 窗口和渲染器到这里已经创建完成，放行播放线程
        if start.send(()).is_err() {
            debug!("播放线程已退出，忽略开始信号");
        }

        Self {
            commands,
            status,
            media_info,
            strip_height,
            video_renderer: EguiVideoRenderer::new(surface),
            transport: None,
            quit_sent: false,
            closing: false,
        }
    }

    fn send(&mut self, command: TransportCommand) {
        if command == TransportCommand::Quit {
            if self.quit_sent {
                return;
            }
            self.quit_sent = true;
        }
        debug!("发送传输命令: {:?}", command);
        // 播放线程已退出时发送失败，忽略即可
        let _ = self.commands.send(command);
    }

    fn handle_input(&mut self, ctx: &Context) {
        let events: Vec<UiEvent> =
            ctx.input(|i| i.events.iter().filter_map(translate_event).collect());

        for event in events {
            let command = self
                .transport
                .as_mut()
                .and_then(|transport| transport.on_event(event));
            if let Some(command) = command {
                self.send(command);
            }
        }
    }

    fn render_control_strip(&self, ui: &mut Ui, state: PlaybackState, position_ms: i64) {
        let Some(transport) = &self.transport else {
            return;
        };
        let layout = transport.layout();
        let Some(strip) = layout.strip else {
            return;
        };

        let painter = ui.painter();
        painter.rect_filled(strip, 0.0, STRIP_BACKGROUND);

        let (play_color, pause_color) = match state {
            PlaybackState::Paused => (BUTTON_IDLE, BUTTON_ACTIVE),
            _ => (BUTTON_ACTIVE, BUTTON_IDLE),
        };
        painter.add(play_icon(layout.play, play_color));
        for bar in pause_bars(layout.pause) {
            painter.rect_filled(bar, 2.0, pause_color);
        }

        painter.text(
            Pos2::new(strip.left() + 16.0, strip.center().y),
            egui::Align2::LEFT_CENTER,
            format!(
                "{} / {}",
                format_time(position_ms),
                format_time(self.media_info.duration_ms)
            ),
            egui::FontId::proportional(12.0),
            Color32::WHITE,
        );
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let status = self.status.snapshot();

        if status.state == PlaybackState::Stopped {
            if !self.closing {
                info!("🛑 播放结束，关闭窗口");
                self.closing = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            return;
        }

        if self.transport.is_none() {
            self.transport = Some(TransportController::new(ctx.screen_rect(), self.strip_height));
        }

        self.handle_input(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let video_rect = self
                    .transport
                    .as_ref()
                    .map(|t| t.layout().video)
                    .unwrap_or_else(|| ui.max_rect());
                self.video_renderer.update_and_render(ui, video_rect);
                self.render_control_strip(ui, status.state, status.position_ms);
            });

        ctx.request_repaint_after(Duration::from_millis(16));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("🔚 PlayerApp 退出，已上传 {} 帧纹理", self.video_renderer.texture_updates());
        self.send(TransportCommand::Quit);
    }
}

/// 只关心按下：主键点击、空格、Esc/Q
fn translate_event(event: &Event) -> Option<UiEvent> {
    match event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed: true,
            ..
        } => Some(UiEvent::PointerDown { x: pos.x, y: pos.y }),
        Event::Key {
            key,
            pressed: true,
            repeat: false,
            ..
        } => match key {
            Key::Space => Some(UiEvent::TogglePlayback),
            Key::Escape | Key::Q => Some(UiEvent::Quit),
            _ => None,
        },
        _ => None,
    }
}

fn play_icon(rect: Rect, color: Color32) -> Shape {
    let inset = rect.shrink(rect.width() * 0.2);
    Shape::convex_polygon(
        vec![
            inset.left_top(),
            Pos2::new(inset.right(), inset.center().y),
            inset.left_bottom(),
        ],
        color,
        Stroke::NONE,
    )
}

fn pause_bars(rect: Rect) -> [Rect; 2] {
    let inset = rect.shrink(rect.width() * 0.2);
    let bar_width = inset.width() / 3.0;
    [
        Rect::from_min_size(inset.left_top(), egui::vec2(bar_width, inset.height())),
        Rect::from_min_size(
            Pos2::new(inset.right() - bar_width, inset.top()),
            egui::vec2(bar_width, inset.height()),
        ),
    ]
}

/// 格式化时间显示
fn format_time(ms: i64) -> String {
    let total_seconds = (ms.max(0) / 1000) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
