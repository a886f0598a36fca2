//! Itinerary cards.
//!
//! A card is a 1200x800 PNG: a header band coloured by cabin, the flight
//! details in a block font, a bar showing distance flown, and a QR code in
//! the bottom-right corner that encodes the flight for scanning.

mod glyphs;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Luma, Rgb, RgbImage};
use qrcode::{EcLevel, QrCode};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{CabinClass, FlightRecord};

/// Card width in pixels.
pub const CARD_WIDTH: u32 = 1200;
/// Card height in pixels.
pub const CARD_HEIGHT: u32 = 800;
/// QR code edge length in pixels.
pub const QR_SIZE: u32 = 200;
/// Gap between the QR code and the card edges.
const QR_MARGIN: u32 = 50;

const HEADER_HEIGHT: u32 = 160;
const LEFT: u32 = 50;
/// Distance that fills the bar completely.
const BAR_FULL_KM: u32 = 20_000;
const BAR_WIDTH: u32 = 800;
/// Longest detail line before it would run into the QR code.
const MAX_LINE_CHARS: usize = 28;
const DETAIL_SCALE: u32 = 5;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([30, 30, 30]);
const TRACK: Rgb<u8> = Rgb([225, 225, 225]);

/// Header colour for a cabin.
#[must_use]
pub fn cabin_color(cabin: CabinClass) -> Rgb<u8> {
    match cabin {
        CabinClass::Economy => Rgb([33, 102, 172]),
        CabinClass::PremiumEconomy => Rgb([27, 158, 119]),
        CabinClass::Business => Rgb([117, 63, 153]),
        CabinClass::First => Rgb([196, 148, 32]),
    }
}

/// Text encoded in a card's QR code.
#[must_use]
pub fn qr_payload(record: &FlightRecord) -> String {
    format!(
        "Flight:{}|From:{}|To:{}|Dep:{}|Airline:{}",
        record.flight_number,
        record.origin,
        record.destination,
        record.departure.format("%Y-%m-%dT%H:%M:%S"),
        record.carrier
    )
}

/// File name for a card rendered at `at`: `<flight>_<YYYYmmdd_HHMMSS>.png`.
#[must_use]
pub fn file_name(record: &FlightRecord, at: DateTime<Local>) -> String {
    let flight: String = record
        .flight_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{flight}_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Renders itinerary cards into a directory.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    output_dir: PathBuf,
}

impl CardRenderer {
    /// Create a renderer writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render a card for `record` and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the image
    /// cannot be encoded or written.
    pub fn render(&self, record: &FlightRecord) -> Result<PathBuf> {
        self.render_at(record, Local::now())
    }

    /// Like [`CardRenderer::render`], naming the file after `at`.
    ///
    /// # Errors
    ///
    /// See [`CardRenderer::render`].
    pub fn render_at(&self, record: &FlightRecord, at: DateTime<Local>) -> Result<PathBuf> {
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|source| {
                Error::DirectoryCreate {
                    path: self.output_dir.clone(),
                    source,
                }
            })?;
        }

        let card = compose(record)?;
        let path = self.output_dir.join(file_name(record, at));
        card.save(&path)
            .map_err(|e| Error::card_render(&record.flight_number, e.to_string()))?;

        info!(flight = %record.flight_number, "Card written to {}", path.display());
        Ok(path)
    }
}

fn compose(record: &FlightRecord) -> Result<RgbImage> {
    let mut card = RgbImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, WHITE);

    fill_rect(&mut card, 0, 0, CARD_WIDTH, HEADER_HEIGHT, cabin_color(record.cabin));
    draw_text(
        &mut card,
        &format!("FLIGHT {}", record.flight_number),
        LEFT,
        52,
        8,
        WHITE,
    );
    draw_text(
        &mut card,
        &format!("{} > {}", record.origin, record.destination),
        LEFT,
        200,
        12,
        INK,
    );

    let lines = [
        format!("DEP {}", record.departure.format("%Y-%m-%d %H:%M")),
        format!("ARR {}", record.arrival.format("%Y-%m-%d %H:%M")),
        format!("AIRLINE {}", record.carrier),
        format!("CABIN {}", record.cabin),
        format!("DISTANCE {} KM", record.distance_km),
    ];
    for (i, line) in (0u32..).zip(lines.iter()) {
        let line: String = line.chars().take(MAX_LINE_CHARS).collect();
        let y = 340 + i * (glyphs::HEIGHT + 5) * DETAIL_SCALE;
        draw_text(&mut card, &line, LEFT, y, DETAIL_SCALE, INK);
    }

    let filled = BAR_WIDTH * record.distance_km.min(BAR_FULL_KM) / BAR_FULL_KM;
    fill_rect(&mut card, LEFT, 700, BAR_WIDTH, 30, TRACK);
    fill_rect(&mut card, LEFT, 700, filled, 30, cabin_color(record.cabin));

    let qr = qr_image(record)?;
    let x = CARD_WIDTH - QR_SIZE - QR_MARGIN;
    let y = CARD_HEIGHT - QR_SIZE - QR_MARGIN;
    imageops::overlay(&mut card, &qr, i64::from(x), i64::from(y));

    debug!(flight = %record.flight_number, "Composed card");
    Ok(card)
}

fn qr_image(record: &FlightRecord) -> Result<RgbImage> {
    let code = QrCode::with_error_correction_level(qr_payload(record).as_bytes(), EcLevel::L)
        .map_err(|e| Error::card_render(&record.flight_number, e.to_string()))?;
    let modules = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(QR_SIZE, QR_SIZE)
        .build();
    let scaled = imageops::resize(&modules, QR_SIZE, QR_SIZE, FilterType::Nearest);
    Ok(DynamicImage::ImageLuma8(scaled).to_rgb8())
}

fn fill_rect(card: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let x_end = (x + width).min(card.width());
    let y_end = (y + height).min(card.height());
    for py in y..y_end {
        for px in x..x_end {
            card.put_pixel(px, py, color);
        }
    }
}

/// Draw `text` with its top-left corner at (`x`, `y`), each glyph cell
/// `scale` pixels square.
fn draw_text(card: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let advance = (glyphs::WIDTH + 1) * scale;
    for (i, c) in (0u32..).zip(text.chars()) {
        let origin_x = x + i * advance;
        for (row, bits) in (0u32..).zip(glyphs::glyph(c)) {
            for col in 0..glyphs::WIDTH {
                if (bits >> (glyphs::WIDTH - 1 - col)) & 1 == 1 {
                    fill_rect(
                        card,
                        origin_x + col * scale,
                        y + row * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}
