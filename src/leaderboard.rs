//! Ranking of accounts by their minted score NFTs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One account as reported by the NFT contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub address: String,
    pub total_nfts: u32,
    /// Score of every NFT held, duplicates included
    pub scores: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    TotalNfts,
    UniqueScores,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderEntry {
    /// 1-based
    pub rank: usize,
    pub address: String,
    pub total_nfts: u32,
    pub unique_scores: usize,
    pub scores: Vec<u32>,
    pub is_current_user: bool,
}

impl LeaderEntry {
    /// `0x1234...abcd`
    pub fn short_address(&self) -> String {
        let chars: Vec<char> = self.address.chars().collect();
        if chars.len() <= 10 {
            return self.address.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Rank `records` by `key`, highest first
///
/// Ties keep their input order.
pub fn rank(records: &[UserRecord], key: SortKey, current_user: Option<&str>) -> Vec<LeaderEntry> {
    let current = current_user.map(str::to_lowercase);
    let mut entries: Vec<LeaderEntry> = records
        .iter()
        .map(|r| LeaderEntry {
            rank: 0,
            address: r.address.clone(),
            total_nfts: r.total_nfts,
            unique_scores: r.scores.iter().collect::<BTreeSet<_>>().len(),
            scores: r.scores.clone(),
            is_current_user: current.as_deref() == Some(r.address.to_lowercase().as_str()),
        })
        .collect();

    match key {
        SortKey::TotalNfts => entries.sort_by(|a, b| b.total_nfts.cmp(&a.total_nfts)),
        SortKey::UniqueScores => entries.sort_by(|a, b| b.unique_scores.cmp(&a.unique_scores)),
    }
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, scores: &[u32]) -> UserRecord {
        UserRecord {
            address: address.to_string(),
            total_nfts: scores.len() as u32,
            scores: scores.to_vec(),
        }
    }

    #[test]
    fn test_rank_by_total() {
        let records = vec![
            record("0xaaaa", &[1]),
            record("0xbbbb", &[1, 1, 1]),
            record("0xcccc", &[2, 3]),
        ];
        let board = rank(&records, SortKey::TotalNfts, None);
        let order: Vec<_> = board.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(order, vec!["0xbbbb", "0xcccc", "0xaaaa"]);
        assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_by_unique_scores() {
        let records = vec![record("0xbbbb", &[1, 1, 1]), record("0xcccc", &[2, 3])];
        let board = rank(&records, SortKey::UniqueScores, None);
        assert_eq!(board[0].address, "0xcccc");
        assert_eq!(board[0].unique_scores, 2);
        assert_eq!(board[1].unique_scores, 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![record("0x01", &[4]), record("0x02", &[5]), record("0x03", &[6])];
        let board = rank(&records, SortKey::TotalNfts, None);
        let order: Vec<_> = board.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(order, vec!["0x01", "0x02", "0x03"]);
    }

    #[test]
    fn test_current_user_is_case_insensitive() {
        let records = vec![record("0xAbCd", &[1]), record("0xeeee", &[2])];
        let board = rank(&records, SortKey::TotalNfts, Some("0xABCD"));
        assert!(board[0].is_current_user);
        assert!(!board[1].is_current_user);
    }

    #[test]
    fn test_short_address() {
        let entry = rank(
            &[record("0x079Fe31EE22088a6B9cB2615D8e6AB9DFb3A75a5", &[])],
            SortKey::TotalNfts,
            None,
        )
        .remove(0);
        assert_eq!(entry.short_address(), "0x079F...75a5");
    }
}
