use geocache::{LatLng, MapLayer, Score, SessionNotice, VisibleCache};

/// Plain-text map: one line per cache, then the player and score.
#[derive(Debug, Default)]
pub(crate) struct TextMapLayer {
    lines: Vec<String>,
}

impl TextMapLayer {
    pub(crate) fn drain_lines(&mut self) -> impl Iterator<Item = String> + '_ {
        self.lines.drain(..)
    }
}

impl MapLayer for TextMapLayer {
    fn clear_caches(&mut self) {
        self.lines.clear();
    }

    fn draw_cache(&mut self, cache: &VisibleCache) {
        self.lines.push(format!(
            "cache {},{} value={} bounds=[{:.6},{:.6}]..[{:.6},{:.6}]",
            cache.cell.i,
            cache.cell.j,
            cache.value,
            cache.bounds.min.lat,
            cache.bounds.min.lng,
            cache.bounds.max.lat,
            cache.bounds.max.lng
        ));
    }

    fn draw_player(&mut self, position: LatLng) {
        self.lines
            .push(format!("player {:.6},{:.6}", position.lat, position.lng));
    }

    fn show_score(&mut self, score: Score) {
        self.lines.push(format!("score {}", score.get()));
    }

    fn show_notice(&mut self, notice: &SessionNotice) {
        let line = match notice {
            SessionNotice::GeolocationUnavailable(reason) => {
                format!("notice: location unavailable ({reason})")
            }
            SessionNotice::PersistenceFailed(reason) => {
                format!("notice: progress was not saved ({reason})")
            }
        };
        self.lines.push(line);
    }
}
