use crate::manifest::Rendition;

pub const DEFAULT_MAX_TARGET_HEIGHT: u32 = 720;

/// Picks the best rendition that stays at or below `max_height`.
///
/// Among renditions with a known height ≤ `max_height` the highest bandwidth
/// wins. When none qualify the absolute lowest bandwidth is returned. Ties keep
/// first-seen order in both cases.
pub fn pick_target_rendition(renditions: &[Rendition], max_height: u32) -> Option<&Rendition> {
    let mut best: Option<&Rendition> = None;
    for r in renditions {
        let qualifies = r.effective_height().is_some_and(|h| h <= max_height);
        if qualifies && best.map_or(true, |b| r.bandwidth > b.bandwidth) {
            best = Some(r);
        }
    }

    best.or_else(|| renditions.iter().min_by_key(|r| r.bandwidth))
}
