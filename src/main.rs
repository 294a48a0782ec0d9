use anyhow::{Context as _, Result};
use log::{error, info};
use std::process::ExitCode;

mod app;
mod core;
mod player;
mod renderer;

use app::PlayerApp;
use crate::core::{PlayerConfig, PlayerError};
use player::PlaybackSession;

const WINDOW_TITLE: &str = "MediaPlayer";

fn main() -> ExitCode {
    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        // 过滤掉 wgpu 相关的警告日志，减少日志噪音
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Error)
        .filter_module("naga", log::LevelFilter::Error)
        .init();

    let Some(media_path) = std::env::args_os().nth(1) else {
        eprintln!("用法: {} <媒体文件>", WINDOW_TITLE);
        return ExitCode::FAILURE;
    };

    match run(PlayerConfig::from_env(media_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", WINDOW_TITLE, e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: PlayerConfig) -> Result<()> {
    info!("🎬 {} 启动", WINDOW_TITLE);

    // 初始化 FFmpeg
    ffmpeg_next::init().context("FFmpeg 初始化失败")?;
    info!("✅ FFmpeg 初始化成功");

    let session = PlaybackSession::start(&config)?;
    let media_info = session.media_info().clone();
    info!(
        "✅ 播放器已就绪: {}x{} @ {:.2} fps, {} Hz",
        media_info.width, media_info.height, media_info.frame_rate, media_info.sample_rate
    );

    let strip_height = config.control_strip_height;
    if !config.has_control_strip() {
        info!("控制条已关闭，使用空格/Esc 控制播放");
    }
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([
                media_info.width as f32,
                media_info.height as f32 + strip_height,
            ])
            .with_resizable(false)
            .with_title(WINDOW_TITLE),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };

    let commands = session.commands();
    let status = session.status();
    let surface = session.surface();
    let start = session.start_signal();
    let window = eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            Box::new(PlayerApp::new(
                cc,
                commands,
                status,
                surface,
                start,
                media_info,
                strip_height,
            ))
        }),
    );

    // 窗口创建失败时播放线程还停在开始信号之前，没有读过任何数据
    if let Err(e) = window {
        error!("❌ 窗口创建失败: {}", e);
        session.quit();
        let _ = session.wait();
        return Err(PlayerError::OutputDeviceError(format!("窗口创建失败: {}", e)).into());
    }

    // 窗口关闭（用户退出）时播放线程可能还在跑
    if !session.status().is_stopped() {
        session.quit();
    }
    let report = session.wait()?;
    match serde_json::to_string(&report) {
        Ok(json) => info!("📊 播放统计: {}", json),
        Err(_) => info!("📊 播放统计: {:?}", report),
    }
    Ok(())
}
