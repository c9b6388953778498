//! Listing quality heuristic and the marked-up price shown to buyers.

use rand::Rng;

const GOVERNMENT_RATE: f64 = 0.05;

/// Keyword score in `[0.5, 1.0]`. `price` does not influence the score today.
pub fn analyze_quality(name: &str, description: &str, category: &str, _price: f64) -> f64 {
    let text = format!("{} {} {}", name, description, category).to_lowercase();
    let mut score: f64 = 0.5;
    if text.contains("organic") {
        score += 0.2;
    }
    if text.contains("premium") || text.contains("pure") {
        score += 0.15;
    }
    if text.contains("grade a") {
        score += 0.1;
    }
    score.min(1.0)
}

pub fn quality_label(score: f64) -> &'static str {
    if score >= 0.9 {
        "Premium Grade"
    } else if score >= 0.8 {
        "High Quality"
    } else if score >= 0.6 {
        "Standard Grade"
    } else {
        "Fair Quality"
    }
}

fn quality_bonus(score: f64) -> f64 {
    if score > 0.8 {
        0.05
    } else if score > 0.5 {
        0.02
    } else {
        0.0
    }
}

pub fn compute_adjusted_price(base_price: f64, quality_score: f64) -> f64 {
    let adjusted = base_price * (1.0 + GOVERNMENT_RATE + quality_bonus(quality_score));
    (adjusted * 100.0).round() / 100.0
}

/// Star rating for display. Maps 0.5..1.0 onto 3.5..5.0 and adds a 5-10% random lift,
/// so two views of the same listing can disagree.
pub fn display_rating<R: Rng + ?Sized>(quality_score: f64, rng: &mut R) -> f64 {
    let base = 3.5 + ((quality_score - 0.5).max(0.0) / 0.5) * 1.5;
    let lifted = (base * (1.0 + rng.gen_range(0.05..=0.10))).min(5.0);
    (lifted * 10.0).round() / 10.0
}
