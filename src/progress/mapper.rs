use super::CrawlStage;

/// Maps stage-local progress onto the overall 0-100 scale
///
/// Each stage owns a fixed slice of the overall range. The slices are
/// contiguous, non-overlapping, ordered, and together cover [0, 100]:
///
/// | stage           | range    |
/// |-----------------|----------|
/// | starting        | [0, 0]   |
/// | analyzing       | [0, 10]  |
/// | crawling        | [10, 60] |
/// | processing      | [60, 85] |
/// | code_extraction | [85, 95] |
/// | finalizing      | [95, 100]|
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressMapper;

impl ProgressMapper {
    pub fn new() -> Self {
        Self
    }

    /// Returns the `(start, end)` slice of the overall range owned by `stage`
    pub fn range(&self, stage: CrawlStage) -> (u8, u8) {
        match stage {
            CrawlStage::Starting => (0, 0),
            CrawlStage::Analyzing => (0, 10),
            CrawlStage::Crawling => (10, 60),
            CrawlStage::Processing => (60, 85),
            CrawlStage::CodeExtraction => (85, 95),
            CrawlStage::Finalizing => (95, 100),
        }
    }

    /// Linearly interpolates a stage-local percentage into the overall
    /// range, clamped to the stage's slice.
    pub fn map_progress(&self, stage: CrawlStage, stage_percent: u8) -> u8 {
        let (start, end) = self.range(stage);
        let local = stage_percent.min(100) as u32;
        let span = (end - start) as u32;
        let overall = start as u32 + span * local / 100;
        (overall as u8).clamp(start, end)
    }
}
