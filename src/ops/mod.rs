// ============================================================================
// OPS: raster operations on the drawing surface
// ============================================================================
//
//   paint.rs : coverage masks, blend modes, primitive rasterization
//   brush.rs : freehand stroke rendering for each brush style
//   shapes.rs: shape geometry and the live drag preview
//   text.rs  : font loading and text rasterization
// ============================================================================

pub mod brush;
pub mod paint;
pub mod shapes;
pub mod text;
