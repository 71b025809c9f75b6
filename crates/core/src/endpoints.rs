//! Well-known upstream endpoints.
//!
//! URL constants for the Taiwan market data sources the crawler knows how
//! to talk to. Callers are free to point a [`RequestKey`](crate::RequestKey)
//! at any other URL; nothing in the pipeline depends on this list.

/// TWSE listed-company profiles (JSON).
pub const TWSE_COMPANY_INFO: &str = "https://openapi.twse.com.tw/v1/opendata/t187ap03_L";

/// TWSE ex-dividend dates (JSON).
pub const TWSE_DIVIDEND: &str = "https://openapi.twse.com.tw/v1/exchangeReport/TWT48U_ALL";

/// TWSE disciplined ("punished") stock announcements (JSON).
pub const TWSE_PUNISH: &str = "https://openapi.twse.com.tw/v1/announcement/punish";

/// TPEX over-the-counter company profiles (JSON).
pub const TPEX_COMPANY_INFO: &str = "https://www.tpex.org.tw/openapi/v1/mopsfin_t187ap03_O";

/// TPEX ex-dividend dates (JSON).
pub const TPEX_DIVIDEND: &str = "https://www.tpex.org.tw/openapi/v1/tpex_exright_prepost";

/// TPEX disciplined stock announcements (JSON).
pub const TPEX_PUNISH: &str = "https://www.tpex.org.tw/openapi/v1/tpex_disposal_information";

/// Fubon broker main-force buy/sell detail page (HTML table).
pub const FUBON_MAIN_FORCE: &str = "https://fubon-ebrokerdj.fbs.com.tw/z/zc/zco/zco.djhtm";

/// MOPS material-information announcements, all listed companies (HTML
/// table).
pub const MOPS_NEWS: &str = "https://mops.twse.com.tw/mops/web/t05sr01_1";

/// MoneyDJ stock category index page (HTML table).
pub const MONEYDJ_STOCK_CATEGORY: &str = "https://www.moneydj.com/Z/ZH/ZHA/ZHA.djhtm";

/// Lookback window for the Fubon main-force pages.
///
/// The upstream encodes the window as a small integer, not a day count.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecentDay {
    /// Most recent trading day.
    One,
    /// Last five trading days.
    Five,
    /// Last ten trading days.
    Ten,
    /// Last twenty trading days.
    Twenty,
    /// Last sixty trading days.
    Sixty,
    /// Last 120 trading days.
    OneHundredTwenty,
    /// Last 240 trading days.
    TwoHundredForty,
}

impl RecentDay {
    /// The upstream query-parameter value for this window.
    pub fn query_value(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Five => "2",
            Self::Ten => "3",
            Self::Twenty => "4",
            Self::Sixty => "5",
            Self::OneHundredTwenty => "6",
            Self::TwoHundredForty => "7",
        }
    }
}
