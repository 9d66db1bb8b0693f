//! Pagination engine.
//!
//! [`Paginator`] turns a [`Document`](crate::Document) into [`Page`]s for a
//! given [`LayoutParams`], consulting a [`TextMeasurer`] for line breaks.
//! Every fragment carries an [`Anchor`] so a reading position can be carried
//! across layout changes with [`restore_anchor`].

mod anchor;
mod measure;
mod paginate;
mod params;

pub use anchor::{Anchor, page_containing, restore_anchor};
pub use measure::{
    FixedAdvanceMeasurer, FontFamily, FontSpec, LineMetrics, TextMeasurer, Typography,
};
pub use paginate::{
    INLINE_IMAGE_FRACTION, MIN_LINE_SPACE, Page, PagePart, Paginator, PositionedElement,
};
pub use params::LayoutParams;
