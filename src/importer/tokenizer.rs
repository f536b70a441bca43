// ==========================================
// 非营利运营平台 - CSV 分词器
// ==========================================
// 阶段 0: 全文 → 记录序列（首条为表头）
// 规则: 先按行切分再逐行分词（引号不跨行），RFC 4180 引号（"" 转义），
//       跳过空白行，去除 UTF-8 BOM
// ==========================================

use crate::domain::RawRow;
use crate::importer::error::ImportError;
use csv::{ReaderBuilder, StringRecord};
use std::str::Lines;
use std::sync::Arc;

const UTF8_BOM: char = '\u{feff}';

// ==========================================
// CsvTokenizer
// ==========================================
// 不持有解析状态；每次调用 records()/rows() 都从头重新分词
#[derive(Debug, Clone, Copy)]
pub struct CsvTokenizer<'a> {
    text: &'a str,
}

impl<'a> CsvTokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text: text.strip_prefix(UTF8_BOM).unwrap_or(text),
        }
    }

    /// 惰性记录序列（不区分表头）
    pub fn records(&self) -> Records<'a> {
        let mut builder = ReaderBuilder::new();
        builder.has_headers(false).flexible(true); // 允许行长度不一致
        Records {
            lines: self.text.lines(),
            builder,
        }
    }

    /// 拆出表头，返回数据行序列
    ///
    /// # 返回
    /// - Ok(RawRows): 数据行（行号 = 数据序号 + 2）
    /// - Err(EmptyFile): 文件不含任何非空行
    pub fn rows(&self) -> Result<RawRows<'a>, ImportError> {
        let mut records = self.records();
        let header = match records.next() {
            Some(record) => record?,
            None => return Err(ImportError::EmptyFile),
        };

        let headers: Arc<[String]> = header
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>()
            .into();

        Ok(RawRows {
            headers,
            records,
            index: 0,
        })
    }
}

/// 记录序列（已跳过空白行）
pub struct Records<'a> {
    lines: Lines<'a>,
    builder: ReaderBuilder,
}

impl Records<'_> {
    // 单行分词；未闭合的引号在行尾结束
    fn tokenize_line(&self, line: &str) -> Result<Vec<String>, ImportError> {
        let mut reader = self.builder.from_reader(line.as_bytes());
        let mut record = StringRecord::new();
        reader.read_record(&mut record)?;
        Ok(record.iter().map(str::to_string).collect())
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Vec<String>, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.by_ref().find(|line| !line.trim().is_empty())?;
        Some(self.tokenize_line(line))
    }
}

/// 数据行序列
pub struct RawRows<'a> {
    headers: Arc<[String]>,
    records: Records<'a>,
    index: usize,
}

impl RawRows<'_> {
    pub fn headers(&self) -> &Arc<[String]> {
        &self.headers
    }
}

impl Iterator for RawRows<'_> {
    type Item = Result<RawRow, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cells = match self.records.next()? {
            Ok(cells) => cells,
            Err(e) => return Some(Err(e)),
        };
        self.index += 1;
        // 表头占第 1 行
        let row_number = self.index + 1;
        Some(Ok(RawRow::new(row_number, Arc::clone(&self.headers), cells)))
    }
}
