//! DocQuill WMF player
//!
//! Windows Metafile interpreter for DocQuill:
//! - a two-pass player (`scan` for the bounding box, `play` to draw)
//! - a `Device` trait any rendering backend can implement
//! - an SVG backend and one-call WMF to SVG conversion
//!
//! The Python bindings are compiled with the `python` feature.

pub mod error;
pub mod records;
pub mod stream;
pub mod coord;
pub mod region;
pub mod color;
pub mod device;
pub mod object;
pub mod dc;
mod meta;
pub mod player;
mod svg_writer;
pub mod svg_device;
pub mod wmf;

pub use color::{ColorTable, Rgb};
pub use coord::{DPoint, DRect, LPoint};
pub use dc::DeviceContext;
pub use device::{Device, FixedMetrics, FontMetrics, NullDevice};
pub use error::{WmfError, WmfResult};
pub use player::{Player, PlayerOptions};
pub use region::Region;
pub use svg_device::{SvgDevice, SvgOptions};
pub use wmf::{convert_wmf_to_svg, is_wmf_format};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    use crate::wmf;

    /// Convert WMF file to SVG file
    ///
    /// Args:
    ///     input_path: Path to input WMF file
    ///     output_path: Path to output SVG file
    ///
    /// Returns:
    ///     True if conversion successful
    #[pyfunction]
    fn convert_wmf_to_svg(input_path: &str, output_path: &str) -> PyResult<bool> {
        let input = std::path::Path::new(input_path);
        if !input.exists() {
            return Err(PyErr::new::<pyo3::exceptions::PyFileNotFoundError, _>(format!(
                "Input file not found: {}",
                input_path
            )));
        }

        let data = std::fs::read(input).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("Failed to read input file: {}", e))
        })?;

        if !wmf::is_wmf_format(&data) {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(
                "Input file must be WMF format",
            ));
        }

        let svg_content = wmf::convert_wmf_to_svg(&data)?;

        std::fs::write(output_path, svg_content).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyIOError, _>(format!("Failed to write output file: {}", e))
        })?;

        Ok(true)
    }

    /// Convert WMF bytes to SVG string
    ///
    /// Args:
    ///     wmf_data: WMF data as bytes
    ///
    /// Returns:
    ///     SVG content as string
    #[pyfunction]
    fn convert_wmf_bytes_to_svg(wmf_data: &[u8]) -> PyResult<String> {
        if !wmf::is_wmf_format(wmf_data) {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>("Input must be WMF data"));
        }
        Ok(wmf::convert_wmf_to_svg(wmf_data)?)
    }

    /// Python module for the DocQuill WMF player
    #[pymodule]
    fn docquill_wmf(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(convert_wmf_to_svg, m)?)?;
        m.add_function(wrap_pyfunction!(convert_wmf_bytes_to_svg, m)?)?;
        Ok(())
    }
}
