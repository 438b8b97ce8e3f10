/// Per-draw counters returned by `GraphicPipeline::render`.
use std::ops::AddAssign;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub vertices: u64,
    pub triangles_in: u64,
    pub triangles_clipped: u64,
    pub triangles_culled: u64,
    pub triangles_rasterized: u64,
    pub fragments_tested: u64,
    pub fragments_passed: u64,
    pub fragments_shaded: u64,
}

impl RenderStats {
    /// Share of tested fragments that survived the depth test.
    pub fn depth_pass_rate(&self) -> f64 {
        if self.fragments_tested == 0 {
            return 0.0;
        }
        self.fragments_passed as f64 / self.fragments_tested as f64
    }

    pub fn log_report(&self) {
        log::info!("=== Render Stats ===");
        log::info!("  vertices:             {:12}", self.vertices);
        log::info!("  triangles in:         {:12}", self.triangles_in);
        log::info!("  triangles clipped:    {:12}", self.triangles_clipped);
        log::info!("  triangles culled:     {:12}", self.triangles_culled);
        log::info!("  triangles rasterized: {:12}", self.triangles_rasterized);
        log::info!(
            "  fragments tested:     {:12} ({:.1}% passed)",
            self.fragments_tested,
            self.depth_pass_rate() * 100.0
        );
        log::info!("  fragments shaded:     {:12}", self.fragments_shaded);
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, rhs: Self) {
        self.vertices += rhs.vertices;
        self.triangles_in += rhs.triangles_in;
        self.triangles_clipped += rhs.triangles_clipped;
        self.triangles_culled += rhs.triangles_culled;
        self.triangles_rasterized += rhs.triangles_rasterized;
        self.fragments_tested += rhs.fragments_tested;
        self.fragments_passed += rhs.fragments_passed;
        self.fragments_shaded += rhs.fragments_shaded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_draws() {
        let mut total = RenderStats::default();
        let draw = RenderStats {
            fragments_tested: 4,
            fragments_passed: 1,
            ..Default::default()
        };
        total += draw;
        total += draw;
        assert_eq!(total.fragments_tested, 8);
        assert!((total.depth_pass_rate() - 0.25).abs() < 1e-12);
        assert_eq!(RenderStats::default().depth_pass_rate(), 0.0);
    }
}
