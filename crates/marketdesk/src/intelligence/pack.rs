//! Serializes a [`TaskInsights`] snapshot into the data pack embedded in the
//! summary prompt.

use marketdesk_models::TaskInsights;

/// Upper bound on the data pack, in bytes.
pub const MAX_PACK_BYTES: usize = 12_000;

/// Progressively smaller list caps tried when the pack is over budget.
const LIST_CAPS: [usize; 4] = [10, 5, 2, 1];

pub fn pack_insights(insights: &TaskInsights) -> String {
    pack_with_limit(insights, MAX_PACK_BYTES)
}

/// Same input always yields the same bytes. Lists are shortened before the
/// text is hard-cut, so moderate overflow still produces valid JSON.
pub fn pack_with_limit(insights: &TaskInsights, max_bytes: usize) -> String {
    let mut packed = serialize(insights);
    for cap in LIST_CAPS {
        if packed.len() <= max_bytes {
            return packed;
        }
        packed = serialize(&capped(insights, cap));
    }
    if packed.len() > max_bytes {
        tracing::warn!(
            len = packed.len(),
            max_bytes,
            "data pack still over budget after capping lists; truncating"
        );
        packed.truncate(char_boundary_at_or_before(&packed, max_bytes));
    }
    packed
}

fn serialize(insights: &TaskInsights) -> String {
    serde_json::to_string(insights).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize insights");
        "{}".to_string()
    })
}

fn capped(insights: &TaskInsights, cap: usize) -> TaskInsights {
    let mut out = insights.clone();
    out.blockers.truncate(cap);
    out.assignee_pressure.truncate(cap);
    out.comment_signals.truncate(cap);
    out
}

fn char_boundary_at_or_before(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdesk_models::*;

    fn sample(comment_count: usize, excerpt_len: usize) -> TaskInsights {
        TaskInsights {
            window: InsightWindow {
                recent_cutoff: "2026-10-09".into(),
                today: "2026-10-16".into(),
            },
            totals: InsightTotals {
                open: 4,
                blocked: 1,
                overdue: 2,
                completed_recently: 3,
            },
            blockers: vec![BlockerSignal {
                task_id: "t1".into(),
                task: "Launch webinar".into(),
                reason: None,
                dependency: Some("Legal review".into()),
                assignee_id: None,
                priority: Priority::High,
                days_blocked: 3,
            }],
            assignee_pressure: vec![],
            comment_signals: (0..comment_count)
                .map(|i| CommentSignal {
                    task_id: format!("t{i}"),
                    task: format!("Task {i}"),
                    comments: 1,
                    latest_excerpt: "é".repeat(excerpt_len),
                    flags: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let insights = sample(3, 20);
        assert_eq!(pack_insights(&insights), pack_insights(&insights.clone()));
    }

    #[test]
    fn missing_fields_pass_through_as_null() {
        let packed = pack_insights(&sample(0, 0));
        let value: serde_json::Value = serde_json::from_str(&packed).unwrap();
        assert!(value["blockers"][0]["reason"].is_null());
        assert_eq!(value["window"]["today"], "2026-10-16");
    }

    #[test]
    fn lists_are_capped_before_cutting() {
        // ten signals of ~400 bytes each overflow 2000 bytes; two of them fit
        let packed = pack_with_limit(&sample(10, 200), 2_000);
        assert!(packed.len() <= 2_000);
        let value: serde_json::Value = serde_json::from_str(&packed).unwrap();
        assert!(value["comment_signals"].as_array().unwrap().len() < 10);
    }

    #[test]
    fn hard_cut_respects_char_boundaries() {
        let packed = pack_with_limit(&sample(1, 5_000), 1_001);
        assert!(packed.len() <= 1_001);
        // still a valid String, so the cut landed on a boundary
        assert!(packed.starts_with("{\"window\""));
    }
}
