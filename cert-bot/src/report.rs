//! Current-week ranking and last-week settlement text.

use std::collections::HashMap;

use cert_core::WeekRange;
use storage::ManagedUser;

use crate::aggregate::WeeklyCount;
use crate::config::Participant;

/// Weekly target and fine rate shared by both reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    pub weekly_target_count: u32,
    pub fine_per_missed_cert: u64,
}

impl FinePolicy {
    pub fn fine_for(&self, count: u32) -> u64 {
        u64::from(self.weekly_target_count.saturating_sub(count)).saturating_mul(self.fine_per_missed_cert)
    }
}

/// One row of the current-week ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based position of the first row with this count.
    pub rank: usize,
    /// Shares its count with another row.
    pub tied: bool,
    pub name: String,
    pub count: u32,
}

impl RankedEntry {
    pub fn rank_label(&self) -> String {
        if self.tied {
            format!("공동 {}위", self.rank)
        } else {
            format!("{}위", self.rank)
        }
    }
}

/// One row of the settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEntry {
    pub name: String,
    pub count: u32,
}

/// Count descending, then name in code point order.
fn sort_rows(rows: &mut [(String, u32)]) {
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Competition-ranks this week's counts plus the configured participants. A participant
/// missing from `counts` gets a zero row; one present in `counts` keeps its count and
/// takes the configured name.
pub fn rank_current_week(
    counts: &HashMap<String, WeeklyCount>,
    participants: &[Participant],
) -> Vec<RankedEntry> {
    let mut users: HashMap<&str, (String, u32)> = counts
        .iter()
        .map(|(id, c)| (id.as_str(), (c.user_name.clone(), c.count)))
        .collect();

    for participant in participants {
        users
            .entry(participant.id.as_str())
            .and_modify(|row| row.0 = participant.name.clone())
            .or_insert_with(|| (participant.name.clone(), 0));
    }

    let mut rows: Vec<(String, u32)> = users.into_values().collect();
    sort_rows(&mut rows);

    let mut entries = Vec::with_capacity(rows.len());
    let mut rank = 0;
    for (index, (name, count)) in rows.iter().enumerate() {
        if index == 0 || rows[index - 1].1 != *count {
            rank = index + 1;
        }
        let tied = (index > 0 && rows[index - 1].1 == *count)
            || rows.get(index + 1).is_some_and(|next| next.1 == *count);
        entries.push(RankedEntry {
            rank,
            tied,
            name: name.clone(),
            count: *count,
        });
    }
    entries
}

/// Every active roster user at zero, overwritten by their aggregated count. Users with
/// counts but no roster row are left out.
pub fn settlement_entries(
    counts: &HashMap<String, WeeklyCount>,
    roster: &[ManagedUser],
) -> Vec<SettlementEntry> {
    let mut users: HashMap<&str, (String, u32)> = roster
        .iter()
        .map(|user| (user.user_id.as_str(), (user.name(), 0)))
        .collect();

    for (user_id, weekly) in counts {
        if let Some(row) = users.get_mut(user_id.as_str()) {
            row.1 = weekly.count;
        }
    }

    let mut rows: Vec<(String, u32)> = users.into_values().collect();
    sort_rows(&mut rows);
    rows.into_iter()
        .map(|(name, count)| SettlementEntry { name, count })
        .collect()
}

/// `12345` → `12,345`.
pub fn format_won(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_daily_status(range: &WeekRange, policy: &FinePolicy, entries: &[RankedEntry]) -> String {
    let target = policy.weekly_target_count;
    let body = if entries.is_empty() {
        "- 아직 인증 기록이 없어요. 오늘 한 번 인증해봐요.".to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                let status = if entry.count < target {
                    format!("- 예상 벌금: {}원", format_won(policy.fine_for(entry.count)))
                } else if entry.count == target {
                    "- 상태: 목표 달성".to_string()
                } else {
                    "- 상태: 초과 달성".to_string()
                };
                format!(
                    "{} {}\n- 인증 횟수: {}/{}\n{}",
                    entry.rank_label(),
                    entry.name,
                    entry.count,
                    target,
                    status
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    [
        "📘 이번 주 인증 현황".to_string(),
        format!("기간: {} ~ {}", range.start_label, range.end_label),
        format!(
            "목표: 주 {}회 (미달 1회당 {}원)",
            target,
            format_won(policy.fine_per_missed_cert)
        ),
        String::new(),
        "🏆 랭킹".to_string(),
        body,
    ]
    .join("\n")
}

pub fn format_weekly_settlement(
    range: &WeekRange,
    policy: &FinePolicy,
    entries: &[SettlementEntry],
) -> String {
    let body = if entries.is_empty() {
        "- 집계 대상 인증 기록이 없어요.".to_string()
    } else {
        entries
            .iter()
            .map(|entry| {
                format!(
                    "{}\n- 인증: {}회\n- 확정 벌금: {}원",
                    entry.name,
                    entry.count,
                    format_won(policy.fine_for(entry.count))
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    [
        "💰 지난주 벌금 정산".to_string(),
        format!("기간: {} ~ {}", range.start_label, range.end_label),
        format!(
            "정산 기준: 주 {}회 이상 / 미달 1회당 {}원",
            policy.weekly_target_count,
            format_won(policy.fine_per_missed_cert)
        ),
        String::new(),
        "🧾 개인별 정산".to_string(),
        body,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    const POLICY: FinePolicy = FinePolicy {
        weekly_target_count: 3,
        fine_per_missed_cert: 2000,
    };

    #[test]
    fn test_fine_for_missed_certs() {
        assert_eq!(POLICY.fine_for(0), 6000);
        assert_eq!(POLICY.fine_for(2), 2000);
        assert_eq!(POLICY.fine_for(3), 0);
        assert_eq!(POLICY.fine_for(7), 0);
    }

    #[test]
    fn test_fine_for_saturates_on_huge_rate() {
        let policy = FinePolicy {
            weekly_target_count: 3,
            fine_per_missed_cert: u64::MAX,
        };
        assert_eq!(policy.fine_for(0), u64::MAX);
        assert_eq!(policy.fine_for(2), u64::MAX);
        assert_eq!(policy.fine_for(3), 0);
    }

    fn counts(rows: &[(&str, &str, u32)]) -> HashMap<String, WeeklyCount> {
        rows.iter()
            .map(|(id, name, count)| {
                (
                    id.to_string(),
                    WeeklyCount {
                        user_id: id.to_string(),
                        user_name: name.to_string(),
                        count: *count,
                    },
                )
            })
            .collect()
    }

    fn roster_user(id: &str, name: Option<&str>) -> ManagedUser {
        let now = Utc::now();
        ManagedUser {
            user_id: id.to_string(),
            display_name: name.map(str::to_string),
            chat_id: Some("-1001234567890".to_string()),
            username: None,
            first_name: None,
            last_name: None,
            status: Some("member".to_string()),
            is_active: true,
            source: Some("manual".to_string()),
            created_at: now,
            updated_at: now,
            deactivated_reason: None,
            deactivated_at: None,
            reactivated_at: None,
        }
    }

    fn range() -> WeekRange {
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);
        WeekRange {
            start: at("2024-06-03T02:01:00+09:00"),
            end: at("2024-06-10T02:01:00+09:00"),
            start_label: "06-03 02:01".to_string(),
            end_label: "06-10 02:00".to_string(),
        }
    }

    #[test]
    fn test_competition_ranking_with_ties() {
        let entries = rank_current_week(&counts(&[("3", "C", 3), ("2", "B", 5), ("1", "A", 5)]), &[]);

        let summary: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.rank_label())).collect();
        assert_eq!(
            summary,
            vec![
                ("A", "공동 1위".to_string()),
                ("B", "공동 1위".to_string()),
                ("C", "3위".to_string()),
            ]
        );
    }

    #[test]
    fn test_participants_fill_zero_rows_and_override_names() {
        let participants = vec![
            Participant { id: "1".to_string(), name: "Ann (config)".to_string() },
            Participant { id: "9".to_string(), name: "Zed".to_string() },
        ];
        let entries = rank_current_week(&counts(&[("1", "ann_tg", 2), ("2", "Bo", 1)]), &participants);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Ann (config)");
        assert_eq!(entries[0].count, 2);
        assert_eq!(entries[1].name, "Bo");
        assert_eq!(entries[2].name, "Zed");
        assert_eq!(entries[2].count, 0);
        assert_eq!(entries[2].rank_label(), "3위");
    }

    #[test]
    fn test_settlement_zero_baseline_from_roster() {
        let roster = vec![
            roster_user("1", Some("Ann")),
            roster_user("2", Some("Bo")),
            roster_user("3", None),
        ];
        let entries = settlement_entries(&counts(&[("2", "Bo", 4), ("99", "Outsider", 3)]), &roster);

        assert_eq!(
            entries,
            vec![
                SettlementEntry { name: "Bo".to_string(), count: 4 },
                SettlementEntry { name: "Ann".to_string(), count: 0 },
                SettlementEntry { name: "user_3".to_string(), count: 0 },
            ]
        );
    }

    #[test]
    fn test_format_won() {
        assert_eq!(format_won(0), "0");
        assert_eq!(format_won(999), "999");
        assert_eq!(format_won(2000), "2,000");
        assert_eq!(format_won(1234567), "1,234,567");
    }

    #[test]
    fn test_daily_status_text() {
        let entries = rank_current_week(&counts(&[("1", "Ann", 4), ("2", "Bo", 3), ("3", "Cy", 1)]), &[]);
        let text = format_daily_status(&range(), &POLICY, &entries);

        assert_eq!(
            text,
            "📘 이번 주 인증 현황\n\
             기간: 06-03 02:01 ~ 06-10 02:00\n\
             목표: 주 3회 (미달 1회당 2,000원)\n\
             \n\
             🏆 랭킹\n\
             1위 Ann\n- 인증 횟수: 4/3\n- 상태: 초과 달성\n\
             \n\
             2위 Bo\n- 인증 횟수: 3/3\n- 상태: 목표 달성\n\
             \n\
             3위 Cy\n- 인증 횟수: 1/3\n- 예상 벌금: 4,000원"
        );
    }

    #[test]
    fn test_empty_reports_use_fallback_lines() {
        let daily = format_daily_status(&range(), &POLICY, &[]);
        assert!(daily.ends_with("🏆 랭킹\n- 아직 인증 기록이 없어요. 오늘 한 번 인증해봐요."));

        let settlement = format_weekly_settlement(&range(), &POLICY, &[]);
        assert!(settlement.starts_with("💰 지난주 벌금 정산\n기간: 06-03 02:01 ~ 06-10 02:00\n"));
        assert!(settlement.contains("정산 기준: 주 3회 이상 / 미달 1회당 2,000원\n\n🧾 개인별 정산\n"));
        assert!(settlement.ends_with("- 집계 대상 인증 기록이 없어요."));
    }

    #[test]
    fn test_settlement_text_shows_final_fine() {
        let entries = vec![SettlementEntry { name: "Ann".to_string(), count: 1 }];
        let text = format_weekly_settlement(&range(), &POLICY, &entries);
        assert!(text.ends_with("🧾 개인별 정산\nAnn\n- 인증: 1회\n- 확정 벌금: 4,000원"));
    }
}
