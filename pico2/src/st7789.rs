//! ST7789 display driver for embassy-rp: one RGB565 framebuffer in RAM plus
//! an async DMA flush.
//!
//! The dashboard only redraws when a reading or the page changed, so a single
//! buffer is enough: [`FrameBuffer`] is the `DrawTarget` the widget tree draws
//! into, [`St7789`] pushes the finished buffer to the panel.

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Async, Spi};
use embassy_time::Timer;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use leaf_dashboard_common::config::{SCREEN_HEIGHT, SCREEN_WIDTH};

const WIDTH: usize = SCREEN_WIDTH as usize;
const HEIGHT: usize = SCREEN_HEIGHT as usize;
pub const BUFFER_SIZE: usize = WIDTH * HEIGHT * 2;

// ST7789 commands
const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const INVON: u8 = 0x21;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

// MADCTL: row/column exchange + column mirror = landscape on the PIM715
const MADCTL_LANDSCAPE: u8 = 0x20 | 0x40;
// COLMOD: 16 bit/pixel
const COLMOD_RGB565: u8 = 0x55;

/// Panel on SPI0 with DC and CS under software control.
pub struct St7789<'d> {
    spi: Spi<'d, SPI0, Async>,
    dc: Output<'d>,
    cs: Output<'d>,
}

impl<'d> St7789<'d> {
    pub fn new(
        spi: Spi<'d, SPI0, Async>,
        dc: Output<'d>,
        cs: Output<'d>,
    ) -> Self {
        Self { spi, dc, cs }
    }

    /// Wake the panel and set landscape RGB565 with a full-screen window.
    pub async fn init(&mut self) {
        self.command(SWRESET, &[]).await;
        Timer::after_millis(150).await;
        self.command(SLPOUT, &[]).await;
        Timer::after_millis(10).await;
        self.command(COLMOD, &[COLMOD_RGB565]).await;
        self.command(MADCTL, &[MADCTL_LANDSCAPE]).await;
        // The PIM715 panel needs inversion for correct colors
        self.command(INVON, &[]).await;
        self.command(NORON, &[]).await;
        self.command(DISPON, &[]).await;
        Timer::after_millis(10).await;

        let [x1_hi, x1_lo] = (WIDTH as u16 - 1).to_be_bytes();
        let [y1_hi, y1_lo] = (HEIGHT as u16 - 1).to_be_bytes();
        self.command(CASET, &[0, 0, x1_hi, x1_lo]).await;
        self.command(RASET, &[0, 0, y1_hi, y1_lo]).await;
    }

    /// Command byte with optional parameters in one CS window.
    async fn command(
        &mut self,
        cmd: u8,
        params: &[u8],
    ) {
        self.cs.set_low();
        self.dc.set_low();
        self.spi.write(&[cmd]).await.ok();
        if !params.is_empty() {
            self.dc.set_high();
            self.spi.write(params).await.ok();
        }
        self.cs.set_high();
    }

    /// Send the whole framebuffer. The window was set by `init`.
    pub async fn flush(
        &mut self,
        frame: &FrameBuffer,
    ) {
        self.command(RAMWR, &[]).await;
        self.cs.set_low();
        self.dc.set_high();
        self.spi.write(frame.bytes()).await.ok();
        self.cs.set_high();
    }
}

/// Big-endian RGB565 framebuffer.
pub struct FrameBuffer {
    pixels: &'static mut [u8; BUFFER_SIZE],
}

impl FrameBuffer {
    pub fn new(pixels: &'static mut [u8; BUFFER_SIZE]) -> Self { Self { pixels } }

    #[inline]
    pub fn bytes(&self) -> &[u8] { &self.pixels[..] }

    #[inline]
    fn encode(color: Rgb565) -> [u8; 2] { RawU16::from(color).into_inner().to_be_bytes() }

    #[inline]
    fn offset(
        x: usize,
        y: usize,
    ) -> usize {
        (y * WIDTH + x) * 2
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size { Size::new(SCREEN_WIDTH, SCREEN_HEIGHT) }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(
        &mut self,
        pixels: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y))
                && x < WIDTH
                && y < HEIGHT
            {
                let at = Self::offset(x, y);
                self.pixels[at..at + 2].copy_from_slice(&Self::encode(color));
            }
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.size == Size::zero() {
            return Ok(());
        }

        let pixel = Self::encode(color);
        let x0 = area.top_left.x as usize;
        let width = area.size.width as usize;
        for y in area.rows() {
            let start = Self::offset(x0, y as usize);
            for chunk in self.pixels[start..start + width * 2].chunks_exact_mut(2) {
                chunk.copy_from_slice(&pixel);
            }
        }
        Ok(())
    }

    fn clear(
        &mut self,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let pixel = Self::encode(color);
        for chunk in self.pixels.chunks_exact_mut(2) {
            chunk.copy_from_slice(&pixel);
        }
        Ok(())
    }
}
