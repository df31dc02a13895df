use anyhow::{Result, anyhow, bail};
use rdk_core::{Direction, Dot, Phase, TrialState};
use rdk_timing::Timer;
use std::time::Duration;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::view::ViewTransform;

#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheIndex {
    Dot = 0,
    FixationCross = 1,
    CueLeft = 2,
    CueRight = 3,
    FeedbackCorrect = 4,
    FeedbackIncorrect = 5,
    WelcomeRing = 6,
}

impl CacheIndex {
    pub const STATIC_COUNT: usize = 7;
}

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const DOT_RADIUS_PX: f32 = 4.0;
const CUE_OFFSET_PX: f32 = 80.0;

/// What the current frame should show, taken from the session
#[derive(Debug, Clone, Copy, Default)]
pub struct Scene<'a> {
    pub dots: &'a [Dot],
    pub trial_state: Option<TrialState>,
    /// Correctness of the last response while its feedback is showing
    pub feedback: Option<bool>,
    pub progress: Option<(usize, usize)>,
    pub accuracy: Option<f64>,
}

pub struct RenderStats {
    pub clear: Duration,
    pub phase: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

pub trait Renderer {
    fn clear_dirty(&mut self, dirty: &[Rect]);
    fn blit_cached(&mut self, index: CacheIndex, pos: (f32, f32));
    /// Grey track with the leading `fraction` filled in `color`
    fn fill_bar(&mut self, track: Rect, fraction: f32, color: [u8; 4]);
}

pub trait PhaseRenderer<P: Phase>: Renderer {
    fn render_phase(&mut self, phase: &P, scene: &Scene) -> Result<()>;
}

/// Software renderer: static sprites are rasterized once, then blitted onto
/// an offscreen canvas each frame. Only regions touched this frame or the
/// previous one are cleared and copied to the window's frame buffer.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    view: ViewTransform,

    static_cache: Vec<Pixmap>,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, aperture_radius: f32) -> Result<Self> {
        let canvas = opaque_canvas(width, height)?;
        let mut renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            view: ViewTransform::new(width, height, aperture_radius),
            static_cache: Vec::with_capacity(CacheIndex::STATIC_COUNT),
            canvas,
            dirty_regions: Vec::with_capacity(64),
            first_frame: true,
        };
        renderer.init_cache()?;
        log::debug!(
            "renderer ready: {}x{}, {:.1} px per field unit",
            width,
            height,
            renderer.view.pixels_per_unit()
        );
        Ok(renderer)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        if new_width == 0 || new_height == 0 {
            // minimized; keep the old canvas until we get a real size
            return Ok(());
        }
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.view.resize(new_width, new_height);
        self.canvas = opaque_canvas(new_width, new_height)?;
        self.dirty_regions.clear();
        self.first_frame = true;
        log::debug!("canvas resized to {}x{}", new_width, new_height);
        Ok(())
    }

    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    fn init_cache(&mut self) -> Result<()> {
        let white = [255, 255, 255, 255];
        self.static_cache = vec![
            disc_pixmap(DOT_RADIUS_PX, white)?,
            fixation_pixmap(40, 2.0)?,
            arrow_pixmap(Direction::Left, 30.0, [255, 255, 0, 255])?,
            arrow_pixmap(Direction::Right, 30.0, [255, 255, 0, 255])?,
            disc_pixmap(20.0, [0, 220, 0, 255])?,
            disc_pixmap(20.0, [220, 0, 0, 255])?,
            ring_pixmap(60.0, 3.0, [200, 200, 200, 255])?,
        ];
        debug_assert_eq!(self.static_cache.len(), CacheIndex::STATIC_COUNT);
        Ok(())
    }

    fn copy_dirty_region(&self, dirty: Rect, frame_buffer: &mut [u8]) {
        let Some((x0, y0, x1, y1)) = pixel_bounds(&dirty, self.width, self.height) else {
            return;
        };
        let row_bytes = self.width as usize * 4;
        let canvas_data = self.canvas.data();
        for row in y0..y1 {
            let start = row * row_bytes + x0 * 4;
            let end = row * row_bytes + x1 * 4;
            frame_buffer[start..end].copy_from_slice(&canvas_data[start..end]);
        }
    }

    fn coalesce_dirty(rects: &mut Vec<Rect>) {
        rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects.drain(..) {
            if let Some(last) = out.last_mut() {
                let same_row =
                    (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
                let touching = r.x() <= last.x() + last.width() + 1.0;
                if same_row && touching {
                    let nx = last.x().min(r.x());
                    let nx2 = (last.x() + last.width()).max(r.x() + r.width());
                    if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                        *last = merged;
                        continue;
                    }
                }
            }
            out.push(r);
        }
        *rects = out;
    }

    /// Draws the frame for `phase` into `frame_buffer` (RGBA, window sized).
    pub fn render_frame<P, T>(
        &mut self,
        phase: &P,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &T,
    ) -> Result<RenderStats>
    where
        P: Phase,
        T: Timer,
    {
        let expected = self.width as usize * self.height as usize * 4;
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                frame_buffer.len(),
                expected,
                self.width,
                self.height
            );
        }

        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(Color::BLACK);
            bytemuck::cast_slice_mut::<u8, [u8; 4]>(frame_buffer).fill(BACKGROUND);
            self.dirty_regions.clear();
        }

        // 1) clear what was drawn last frame on the offscreen canvas
        let old_dirty = std::mem::take(&mut self.dirty_regions);
        let t_clear = {
            let t = timer.now();
            self.clear_dirty(&old_dirty);
            timer.elapsed(t)
        };

        // 2) draw new content
        let t_phase = {
            let t = timer.now();
            self.render_phase(phase, scene)?;
            timer.elapsed(t)
        };
        let dirty_count = self.dirty_regions.len();

        // 3) present old and new regions
        let mut present_rects = old_dirty;
        present_rects.extend_from_slice(&self.dirty_regions);
        SkiaRenderer::coalesce_dirty(&mut present_rects);
        let t_copy = {
            let t = timer.now();
            for rect in &present_rects {
                self.copy_dirty_region(*rect, frame_buffer);
            }
            timer.elapsed(t)
        };

        Ok(RenderStats {
            clear: t_clear,
            phase: t_phase,
            copy: t_copy,
            total: t_clear + t_phase + t_copy,
            dirty_count,
        })
    }

    fn blit_cached_fast(&mut self, index: CacheIndex, pos: (f32, f32)) {
        let pixmap = &self.static_cache[index as usize];
        let w = pixmap.width() as i32;
        let h = pixmap.height() as i32;
        let canvas_w = self.canvas.width() as i32;
        let canvas_h = self.canvas.height() as i32;

        let x0 = (pos.0 - w as f32 * 0.5).floor() as i32;
        let y0 = (pos.1 - h as f32 * 0.5).floor() as i32;

        let dst_x_start = x0.max(0);
        let dst_y_start = y0.max(0);
        let dst_x_end = (x0 + w).min(canvas_w);
        let dst_y_end = (y0 + h).min(canvas_h);
        if dst_x_end <= dst_x_start || dst_y_end <= dst_y_start {
            return;
        }

        let src_x_start = (dst_x_start - x0) as usize;
        let src_y_start = (dst_y_start - y0) as usize;
        let max_w = (dst_x_end - dst_x_start) as usize;
        let max_h = (dst_y_end - dst_y_start) as usize;
        let (dst_x, dst_y) = (dst_x_start as usize, dst_y_start as usize);

        let src: &[[u8; 4]] = bytemuck::cast_slice(pixmap.data());
        let dst: &mut [[u8; 4]] = bytemuck::cast_slice_mut(self.canvas.data_mut());
        let src_stride = w as usize;
        let dst_stride = canvas_w as usize;

        for y in 0..max_h {
            let src_row = (src_y_start + y) * src_stride + src_x_start;
            let dst_row = (dst_y + y) * dst_stride + dst_x;
            let src_px = &src[src_row..src_row + max_w];
            let dst_px = &mut dst[dst_row..dst_row + max_w];

            for (d, s) in dst_px.iter_mut().zip(src_px) {
                match s[3] {
                    0 => {}
                    255 => *d = *s,
                    sa => {
                        // premultiplied source-over
                        let inv = 255 - sa as u32;
                        for c in 0..4 {
                            d[c] = (s[c] as u32 + (d[c] as u32 * inv + 127) / 255) as u8;
                        }
                    }
                }
            }
        }

        if let Some(rect) = Rect::from_xywh(
            dst_x as f32,
            dst_y as f32,
            max_w as f32,
            max_h as f32,
        ) {
            self.dirty_regions.push(rect);
        }
    }

    fn progress_track(&self) -> Option<Rect> {
        Rect::from_xywh(20.0, 20.0, (self.width as f32 - 40.0).max(1.0), 6.0)
    }
}

impl Renderer for SkiaRenderer {
    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let (width, height) = (self.width, self.height);
        let stride = width as usize;
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(self.canvas.data_mut());
        for rect in dirty {
            let Some((x0, y0, x1, y1)) = pixel_bounds(rect, width, height) else {
                continue;
            };
            for y in y0..y1 {
                pixels[y * stride + x0..y * stride + x1].fill(BACKGROUND);
            }
        }
    }

    fn blit_cached(&mut self, index: CacheIndex, pos: (f32, f32)) {
        self.blit_cached_fast(index, pos);
    }

    fn fill_bar(&mut self, track: Rect, fraction: f32, color: [u8; 4]) {
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color_rgba8(80, 80, 80, 255);
        self.canvas.fill_rect(track, &paint, Transform::identity(), None);

        let filled = track.width() * fraction.clamp(0.0, 1.0);
        if let Some(bar) = Rect::from_xywh(track.x(), track.y(), filled, track.height()) {
            paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
            self.canvas.fill_rect(bar, &paint, Transform::identity(), None);
        }
        self.dirty_regions.push(track);
    }
}

impl<P> PhaseRenderer<P> for SkiaRenderer
where
    P: Phase,
{
    fn render_phase(&mut self, phase: &P, scene: &Scene) -> Result<()> {
        match phase {
            p if p.is_welcome() => {
                self.blit_cached(CacheIndex::WelcomeRing, self.center);
                self.blit_cached(CacheIndex::FixationCross, self.center);
            }
            p if p.is_experiment() => {
                match scene.trial_state {
                    Some(TrialState::AwaitingStimulus) => {
                        for dot in scene.dots {
                            let pos = self.view.field_to_screen(dot.position);
                            self.blit_cached(CacheIndex::Dot, pos);
                        }
                        self.blit_cached(CacheIndex::FixationCross, self.center);
                    }
                    Some(TrialState::AwaitingResponse) => {
                        self.blit_cached(CacheIndex::FixationCross, self.center);
                        let (cx, cy) = self.center;
                        self.blit_cached(CacheIndex::CueLeft, (cx - CUE_OFFSET_PX, cy));
                        self.blit_cached(CacheIndex::CueRight, (cx + CUE_OFFSET_PX, cy));
                    }
                    Some(TrialState::Logging) => match scene.feedback {
                        Some(true) => self.blit_cached(CacheIndex::FeedbackCorrect, self.center),
                        Some(false) => {
                            self.blit_cached(CacheIndex::FeedbackIncorrect, self.center)
                        }
                        None => {}
                    },
                    Some(TrialState::Done) | None => {}
                }

                if let Some((current, total)) = scene.progress {
                    let track = self
                        .progress_track()
                        .ok_or_else(|| anyhow!("invalid progress bar geometry"))?;
                    let fraction = current as f32 / total.max(1) as f32;
                    self.fill_bar(track, fraction, [150, 150, 150, 255]);
                }
            }
            p if p.is_debrief() => {
                self.blit_cached(CacheIndex::WelcomeRing, self.center);
                if let Some(accuracy) = scene.accuracy {
                    let (cx, cy) = self.center;
                    let track = Rect::from_xywh(cx - 150.0, cy + 100.0, 300.0, 16.0)
                        .ok_or_else(|| anyhow!("invalid accuracy bar geometry"))?;
                    self.fill_bar(track, accuracy as f32, [0, 200, 0, 255]);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Integer pixel bounds of `rect` clipped to the canvas, as (x0, y0, x1, y1)
fn pixel_bounds(rect: &Rect, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    let (w, h) = (width as f32, height as f32);
    let x0 = rect.x().floor().clamp(0.0, w) as usize;
    let y0 = rect.y().floor().clamp(0.0, h) as usize;
    let x1 = (rect.x() + rect.width()).ceil().clamp(0.0, w) as usize;
    let y1 = (rect.y() + rect.height()).ceil().clamp(0.0, h) as usize;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

fn opaque_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
    canvas.fill(Color::BLACK);
    Ok(canvas)
}

fn sprite(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| anyhow!("invalid sprite size {width}x{height}"))
}

fn solid_paint(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

fn disc_pixmap(radius: f32, color: [u8; 4]) -> Result<Pixmap> {
    let size = (radius * 2.0).ceil() as u32 + 2;
    let mut pixmap = sprite(size, size)?;
    let c = size as f32 / 2.0;
    let path = PathBuilder::from_circle(c, c, radius)
        .ok_or_else(|| anyhow!("invalid disc radius {radius}"))?;
    pixmap.fill_path(
        &path,
        &solid_paint(color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Ok(pixmap)
}

fn ring_pixmap(radius: f32, stroke_width: f32, color: [u8; 4]) -> Result<Pixmap> {
    let size = ((radius + stroke_width) * 2.0).ceil() as u32 + 2;
    let mut pixmap = sprite(size, size)?;
    let c = size as f32 / 2.0;
    let path = PathBuilder::from_circle(c, c, radius)
        .ok_or_else(|| anyhow!("invalid ring radius {radius}"))?;
    let stroke = Stroke {
        width: stroke_width,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &solid_paint(color), &stroke, Transform::identity(), None);
    Ok(pixmap)
}

fn fixation_pixmap(size: u32, thickness: f32) -> Result<Pixmap> {
    let mut pm = sprite(size, size)?;
    let mut paint = solid_paint([255, 255, 255, 255]);
    paint.anti_alias = false;

    let extent = size as f32;
    let offset = (extent - thickness) * 0.5;
    let bars = [
        Rect::from_xywh(0.0, offset, extent, thickness),
        Rect::from_xywh(offset, 0.0, thickness, extent),
    ];
    for bar in bars {
        let bar = bar.ok_or_else(|| anyhow!("invalid fixation cross size {size}"))?;
        pm.fill_rect(bar, &paint, Transform::identity(), None);
    }
    Ok(pm)
}

fn arrow_pixmap(direction: Direction, size: f32, color: [u8; 4]) -> Result<Pixmap> {
    let extent = (size * 2.0).ceil() as u32;
    let mut pixmap = sprite(extent, extent)?;
    let (cx, cy) = (size, size);

    let mut pb = PathBuilder::new();
    match direction {
        Direction::Right => {
            pb.move_to(cx + size, cy);
            pb.line_to(cx, cy - size);
            pb.line_to(cx, cy + size);
        }
        Direction::Left => {
            pb.move_to(cx - size, cy);
            pb.line_to(cx, cy - size);
            pb.line_to(cx, cy + size);
        }
    }
    pb.close();
    let path = pb
        .finish()
        .ok_or_else(|| anyhow!("invalid arrow size {size}"))?;
    pixmap.fill_path(
        &path,
        &solid_paint(color),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    Ok(pixmap)
}
