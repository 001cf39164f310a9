//! Frame orchestration: single frame, full range and camera loop.

use crate::bus::ExportBus;
use crate::config::AnimationMode;
use crate::error::{ExportError, Result};
use crate::export::{export_scene, loop_cameras};
use crate::types::FrameRange;

/// Export strategy chosen for one export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStrategy {
    SingleFrame,
    FullRange(FrameRange),
    CameraLoop,
}

/// Pick the strategy for the configured animation mode.
///
/// Frame-by-frame and no-animation exports cover the current frame only;
/// with `frames_to_export > 1` they become a short full-range export from
/// the current frame to `current + frames_to_export`, stepping by the scene
/// step, for multi-frame motion blur.
pub fn frame_strategy(bus: &ExportBus<'_>) -> Result<FrameStrategy> {
    let scene_range = bus.scene.frame_range();
    let strategy = match bus.config.animation_mode {
        AnimationMode::Full => FrameStrategy::FullRange(scene_range),
        AnimationMode::CameraLoop => FrameStrategy::CameraLoop,
        AnimationMode::FrameByFrame | AnimationMode::None => {
            let count = bus.config.frames_to_export;
            if count > 1 {
                let start = bus.scene.frame_current();
                let end = i32::try_from(count)
                    .ok()
                    .and_then(|count| start.checked_add(count))
                    .ok_or_else(|| {
                        ExportError::Export(format!(
                            "Frames to export out of range: {} from frame {}",
                            count, start
                        ))
                    })?;
                FrameStrategy::FullRange(FrameRange::new(start, end, scene_range.step.max(1)))
            } else {
                FrameStrategy::SingleFrame
            }
        }
    };
    Ok(strategy)
}

/// Run the frame stage of an export with the configured strategy.
pub fn export_frames(bus: &mut ExportBus<'_>) -> Result<()> {
    match frame_strategy(bus)? {
        FrameStrategy::SingleFrame => export_single_frame(bus),
        FrameStrategy::FullRange(range) => export_animation(bus, range),
        FrameStrategy::CameraLoop => export_camera_loop(bus),
    }
}

/// Export the current frame once, without interpolation tags.
pub fn export_single_frame(bus: &mut ExportBus<'_>) -> Result<()> {
    let frame = bus.scene.frame_current();
    bus.output.set_animation(false);
    bus.output.set_frame(frame);
    bus.frames.push(frame);
    export_scene(bus)
}

/// Export every frame of `range` into one animated file set.
///
/// The scene's current frame is restored afterwards, also when a frame fails
/// or the export is cancelled between frames.
pub fn export_animation(bus: &mut ExportBus<'_>, range: FrameRange) -> Result<()> {
    let original = bus.scene.frame_current();
    bus.output.set_animation(true);
    bus.output.set_frame_range(Some(range));
    log::info!(
        "Exporting frames {}..{} step {}",
        range.start,
        range.end,
        range.step
    );

    let result = export_range(bus, range);

    bus.scene.set_frame(original);
    result
}

fn export_range(bus: &mut ExportBus<'_>, range: FrameRange) -> Result<()> {
    for (i, frame) in range.frames().enumerate() {
        if bus.cancel.is_cancelled() {
            log::warn!("Export interrupted at frame {}", frame);
            return Err(ExportError::Interrupted);
        }
        if i > 0 {
            bus.cache.begin_frame();
        }
        bus.scene.set_frame(frame);
        bus.output.set_frame(frame);
        bus.frames.push(frame);
        export_scene(bus)?;
    }
    Ok(())
}

/// Export one pseudo-frame per loop camera, each holding only that camera.
///
/// Without loop cameras this falls back to a single-frame export.
pub fn export_camera_loop(bus: &mut ExportBus<'_>) -> Result<()> {
    let cameras = loop_cameras(&bus.scene.objects());
    if cameras.is_empty() {
        log::warn!("Camera loop: no loop cameras enabled, exporting a single frame");
        return export_single_frame(bus);
    }

    let range = FrameRange::new(1, cameras.len() as i32, 1);
    let original = bus.camera.take();
    bus.output.set_animation(true);
    bus.output.set_frame_range(Some(range));
    log::info!("Camera loop: {} cameras", cameras.len());

    let result = export_cameras(bus, &cameras);

    bus.camera = original;
    result
}

fn export_cameras(bus: &mut ExportBus<'_>, cameras: &[String]) -> Result<()> {
    for (i, camera) in cameras.iter().enumerate() {
        if bus.cancel.is_cancelled() {
            return Err(ExportError::Interrupted);
        }
        let frame = i as i32 + 1;
        if i > 0 {
            bus.cache.begin_frame();
        }
        bus.camera = Some(camera.clone());
        bus.output.set_frame(frame);
        bus.frames.push(frame);
        export_scene(bus)?;
    }
    Ok(())
}
