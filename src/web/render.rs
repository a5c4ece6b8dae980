//! Canvas drawing for the tile grid and the moving target.

use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

use crate::game::{AccuracyEngine, ReactionEngine, TileState, Viewport};

const TILE_GAP: f64 = 16.0;
const MAX_TILE: f64 = 110.0;

/// Square grid centred in the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub side: usize,
    pub tiles: usize,
    pub cell: f64,
    pub gap: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridLayout {
    pub fn new(viewport: Viewport, side: usize, tiles: usize) -> Self {
        let side = side.max(1);
        let n = side as f64;
        let fit = (viewport.width.min(viewport.height) - TILE_GAP * (n - 1.0)) / n;
        let cell = fit.clamp(1.0, MAX_TILE);
        let span = cell * n + TILE_GAP * (n - 1.0);
        Self {
            side,
            tiles,
            cell,
            gap: TILE_GAP,
            origin_x: (viewport.width - span) / 2.0,
            origin_y: (viewport.height - span) / 2.0,
        }
    }

    /// Top-left corner of tile `index`.
    pub fn tile_origin(&self, index: usize) -> (f64, f64) {
        let col = (index % self.side) as f64;
        let row = (index / self.side) as f64;
        (
            self.origin_x + col * (self.cell + self.gap),
            self.origin_y + row * (self.cell + self.gap),
        )
    }

    /// Tile under a canvas-local point; gaps and the margin map to `None`.
    pub fn tile_at(&self, x: f64, y: f64) -> Option<usize> {
        let rx = x - self.origin_x;
        let ry = y - self.origin_y;
        if rx < 0.0 || ry < 0.0 {
            return None;
        }
        let pitch = self.cell + self.gap;
        let col = (rx / pitch).floor() as usize;
        let row = (ry / pitch).floor() as usize;
        if col >= self.side || row >= self.side {
            return None;
        }
        if rx - col as f64 * pitch > self.cell || ry - row as f64 * pitch > self.cell {
            return None;
        }
        let index = row * self.side + col;
        (index < self.tiles).then_some(index)
    }
}

pub fn clear(ctx: &CanvasRenderingContext2d, viewport: Viewport) {
    ctx.clear_rect(0.0, 0.0, viewport.width, viewport.height);
}

pub fn draw_grid(ctx: &CanvasRenderingContext2d, layout: &GridLayout, engine: &ReactionEngine) {
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_font("bold 16px sans-serif");
    for i in 0..engine.tile_count() {
        let (x, y) = layout.tile_origin(i);
        let state = engine.tile_state(i);
        let fill = match state {
            TileState::Cleared => "#f3f4f6",
            TileState::Active => "#ef4444",
            TileState::Waiting => "#93c5fd",
        };
        ctx.set_fill_style_str(fill);
        ctx.fill_rect(x, y, layout.cell, layout.cell);
        if state == TileState::Active {
            ctx.set_fill_style_str("#ffffff");
            ctx.fill_text("Click me!", x + layout.cell / 2.0, y + layout.cell / 2.0).ok();
        }
    }
}

pub fn draw_target(
    ctx: &CanvasRenderingContext2d,
    engine: &AccuracyEngine,
    radius: f64,
) -> Result<(), JsValue> {
    let t = engine.target();
    // Outer ring to bullseye.
    let rings = [(1.0, "#ef4444"), (0.66, "#ffffff"), (0.33, "#ef4444")];
    for (scale, color) in rings {
        ctx.begin_path();
        ctx.arc(t.center_x, t.center_y, radius * scale, 0.0, std::f64::consts::TAU)?;
        ctx.set_fill_style_str(color);
        ctx.fill();
    }
    Ok(())
}
