use std::fmt;

/// price-db 每一行開頭的標記
pub const RECORD_MARKER: &str = "P";

/// 一筆價格紀錄，對應 price-db 的一行
///
/// All fields are kept as the text found on the page or in the ledger. Nothing is
/// parsed, so `100.50` and `100.5` are different prices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    /// 價格公布日期
    pub date: String,
    /// 商品代號 (e.g. ZERO)
    pub ident: String,
    /// 價格
    pub amount: String,
    /// 幣別
    pub currency: String,
}

impl PriceRecord {
    pub fn new(date: String, ident: String, amount: String, currency: String) -> Self {
        Self {
            date,
            ident,
            amount,
            currency,
        }
    }

    /// Decodes one ledger line.
    ///
    /// The line must split on single spaces into exactly five tokens: the marker and
    /// the four fields. An empty line or any other token count gives back the
    /// all-empty record, which stands for "no last price known".
    pub fn decode(line: &str) -> Self {
        if line.is_empty() {
            return Self::default();
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        match tokens.as_slice() {
            [_marker, date, ident, amount, currency] => Self::new(
                date.to_string(),
                ident.to_string(),
                amount.to_string(),
                currency.to_string(),
            ),
            _ => Self::default(),
        }
    }

    /// The canonical ledger line, without the trailing newline.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn is_sentinel(&self) -> bool {
        self.date.is_empty()
            && self.ident.is_empty()
            && self.amount.is_empty()
            && self.currency.is_empty()
    }

    /// 提交到 git 時使用的訊息
    pub fn commit_message(&self) -> String {
        format!("Update {}", self.date)
    }
}

impl fmt::Display for PriceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            RECORD_MARKER, self.date, self.ident, self.amount, self.currency
        )
    }
}
