//! 受取人マッピング管理 - 正式名称から略称への変換表（CSV保存）

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("正式名称と略称の両方を入力してください")]
    Empty,
    #[error("この会社名は既に登録されています: {0}")]
    Duplicate(String),
    #[error("マッピングが見つかりません: {0}")]
    NotFound(usize),
    #[error("マッピングファイルの読み書きに失敗: {0}")]
    Io(#[from] std::io::Error),
    #[error("マッピングファイルの形式が不正です: {0}")]
    Csv(#[from] csv::Error),
}

/// マッピング1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(rename = "Full Name")]
    pub full_name: String,
    #[serde(rename = "Short Form")]
    pub short_form: String,
}

/// 並び替え対象の列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    FullName,
    ShortForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// マッピング表
#[derive(Debug, Clone, Default)]
pub struct PayeeMappings {
    entries: Vec<Mapping>,
}

/// 大文字化・前後空白除去・連続空白の圧縮
fn standardize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

impl PayeeMappings {
    pub fn new(entries: Vec<Mapping>) -> Self {
        Self { entries }
    }

    /// CSVから読み込む（ファイルが無ければ空）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let mut reader = csv::Reader::from_path(path)?;
        let entries = reader
            .deserialize::<Mapping>()
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("マッピング読み込み: {} 件 ({:?})", entries.len(), path);
        Ok(Self { entries })
    }

    /// CSVへ保存
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MappingError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(["Full Name", "Short Form"])?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn entries(&self) -> &[Mapping] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// マッピングを追加（正式名称は大文字小文字を区別せず重複不可）
    pub fn add(&mut self, full_name: &str, short_form: &str) -> Result<(), MappingError> {
        let full_name = full_name.trim();
        let short_form = short_form.trim();
        if full_name.is_empty() || short_form.is_empty() {
            return Err(MappingError::Empty);
        }

        let upper = full_name.to_uppercase();
        if self
            .entries
            .iter()
            .any(|e| e.full_name.to_uppercase() == upper)
        {
            return Err(MappingError::Duplicate(full_name.to_string()));
        }

        self.entries.push(Mapping {
            full_name: full_name.to_string(),
            short_form: short_form.to_string(),
        });
        Ok(())
    }

    /// 指定位置のマッピングを削除
    pub fn remove(&mut self, index: usize) -> Result<Mapping, MappingError> {
        if index >= self.entries.len() {
            return Err(MappingError::NotFound(index));
        }
        Ok(self.entries.remove(index))
    }

    /// 並び替え・絞り込み済みの一覧（インデックスは格納位置）
    pub fn view(&self, filter: &str, sort_by: SortColumn, order: SortOrder) -> Vec<(usize, &Mapping)> {
        let filter = filter.trim().to_uppercase();

        let mut rows: Vec<(usize, &Mapping)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                filter.is_empty()
                    || m.full_name.to_uppercase().contains(&filter)
                    || m.short_form.to_uppercase().contains(&filter)
            })
            .collect();

        let key = |m: &Mapping| match sort_by {
            SortColumn::FullName => m.full_name.clone(),
            SortColumn::ShortForm => m.short_form.clone(),
        };
        rows.sort_by(|(_, a), (_, b)| {
            let ord = key(*a).cmp(&key(*b));
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });

        rows
    }

    /// 受取人名を略称に変換（該当なしはそのまま）
    pub fn shortform(&self, payee: &str) -> String {
        if self.entries.is_empty() {
            return payee.to_string();
        }

        let target = standardize(payee);
        self.entries
            .iter()
            .find(|e| standardize(&e.full_name) == target)
            .map(|e| e.short_form.clone())
            .unwrap_or_else(|| payee.to_string())
    }
}
