use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::model::ResolutionOutcome;

/// 枚举结果：完整域名到地址列表的有序映射
///
/// 迭代顺序为首次插入的顺序。重复的域名覆盖旧值，但保留首次出现的位置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumerationResult {
    entries: Vec<(String, Vec<IpAddr>)>,
    index: HashMap<String, usize>,
}

impl EnumerationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖一个域名的地址
    pub fn insert(&mut self, fqdn: String, addresses: Vec<IpAddr>) {
        match self.index.get(&fqdn) {
            Some(&position) => self.entries[position].1 = addresses,
            None => {
                self.index.insert(fqdn.clone(), self.entries.len());
                self.entries.push((fqdn, addresses));
            }
        }
    }

    pub fn get(&self, fqdn: &str) -> Option<&[IpAddr]> {
        self.index
            .get(fqdn)
            .map(|&position| self.entries[position].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IpAddr])> {
        self.entries
            .iter()
            .map(|(fqdn, addresses)| (fqdn.as_str(), addresses.as_slice()))
    }

    /// 所有域名，按结果顺序
    pub fn fqdns(&self) -> Vec<&str> {
        self.entries.iter().map(|(fqdn, _)| fqdn.as_str()).collect()
    }
}

impl Serialize for EnumerationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (fqdn, addresses) in &self.entries {
            map.serialize_entry(fqdn, addresses)?;
        }
        map.end()
    }
}

/// 合并查询结果，丢弃失败项
pub fn aggregate(outcomes: &[ResolutionOutcome]) -> EnumerationResult {
    let mut result = EnumerationResult::new();
    for outcome in outcomes {
        if let ResolutionOutcome::Resolved { fqdn, addresses } = outcome {
            result.insert(fqdn.clone(), addresses.clone());
        }
    }
    result
}
