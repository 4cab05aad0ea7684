//! Low-level drawing primitives used by the widget tree.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Rectangle, RoundedRectangle};
use embedded_graphics::text::Text;

use crate::styles::{BOX_STYLE, CENTERED};

/// Corner radius of a reading box.
const BOX_RADIUS: u32 = 6;

/// Draw a reading box background with a 2px inset so neighbours stay apart.
pub fn draw_box_background<D>(
    display: &mut D,
    area: Rectangle,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    if area.size.width < 4 || area.size.height < 4 {
        return Ok(());
    }
    let inset = Rectangle::new(area.top_left + Point::new(2, 2), area.size - Size::new(4, 4));
    RoundedRectangle::with_equal_corners(inset, Size::new_equal(BOX_RADIUS))
        .into_styled(BOX_STYLE)
        .draw(display)
}

/// Draw `text` centered in `area`, clipped to it.
pub fn draw_centered_text<D>(
    display: &mut D,
    area: Rectangle,
    text: &str,
    style: MonoTextStyle<'static, Rgb565>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    if text.is_empty() {
        return Ok(());
    }
    let mut clipped = display.clipped(&area);
    Text::with_text_style(text, area.center(), style, CENTERED).draw(&mut clipped)?;
    Ok(())
}
