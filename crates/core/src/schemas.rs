//! Ready-made extraction schemas for the known upstream pages.
//!
//! The Fubon broker and MOPS pages render plain `<tr>`/`<td>` tables with
//! header and spacer rows mixed in; required-field coercion drops those
//! rows without any page-specific code. The TWSE/TPEX open-data endpoints
//! answer with JSON arrays and get [`ExtractionSchema::json`] schemas
//! keyed by the upstream field names.

use crate::parser::{DateFormat, ExtractionSchema, FieldRule, FieldType, SymbolRule, Unit};

/// Field names used by the ready-made schemas.
pub mod fields {
    pub const BUY: &str = "buy";
    pub const SELL: &str = "sell";
    pub const OVERBOUGHT: &str = "overbought";
    pub const PROPORTION: &str = "proportion";
    pub const TOTAL: &str = "total";
    pub const DATE: &str = "date";
    pub const NAME: &str = "name";
    pub const TITLE: &str = "title";
    pub const TIME: &str = "time";
    pub const CAPITAL: &str = "capital";
}

/// Buy-side half of the Fubon main-force table.
///
/// Each data row carries both sides in ten cells; this schema reads cells
/// one through five (broker, buy, sell, overbought, share of volume). The
/// record symbol is the broker name.
pub fn fubon_main_force_buyers() -> ExtractionSchema {
    main_force_side(0)
}

/// Sell-side half of the Fubon main-force table, cells six through ten.
pub fn fubon_main_force_sellers() -> ExtractionSchema {
    main_force_side(5)
}

fn main_force_side(offset: usize) -> ExtractionSchema {
    let cell = |n: usize| format!("td:nth-child({})", offset + n);
    ExtractionSchema::for_records("tr", SymbolRule::Selector(cell(1)))
        .with_field(FieldRule::required(fields::BUY, cell(2), FieldType::Integer))
        .with_field(FieldRule::required(
            fields::SELL,
            cell(3),
            FieldType::Integer,
        ))
        .with_field(FieldRule::required(
            fields::OVERBOUGHT,
            cell(4),
            FieldType::Integer,
        ))
        .with_field(FieldRule::optional(
            fields::PROPORTION,
            cell(5),
            FieldType::Decimal {
                unit: Unit::Percent,
            },
        ))
}

/// Per-day buy/sell history for one stock from a Fubon detail page.
///
/// Every row belongs to the stock the page was requested for, so the
/// symbol is fixed to `stock_id`.
pub fn fubon_buy_sell_history(stock_id: &str) -> ExtractionSchema {
    ExtractionSchema::for_records("tr", SymbolRule::Fixed(stock_id.to_string()))
        .with_field(FieldRule::required(
            fields::DATE,
            "td:nth-child(1)",
            FieldType::Date {
                format: DateFormat::SlashYmd,
            },
        ))
        .with_field(FieldRule::required(
            fields::BUY,
            "td:nth-child(2)",
            FieldType::Integer,
        ))
        .with_field(FieldRule::required(
            fields::SELL,
            "td:nth-child(3)",
            FieldType::Integer,
        ))
        .with_field(FieldRule::required(
            fields::TOTAL,
            "td:nth-child(4)",
            FieldType::Integer,
        ))
        .with_field(FieldRule::required(
            fields::OVERBOUGHT,
            "td:nth-child(5)",
            FieldType::Integer,
        ))
}

/// Material-information announcements from the MOPS news page.
///
/// Data rows carry the `even`/`odd` row classes; the five cells are
/// company id, company name, announcement date (ROC, slash-separated),
/// announcement time, and title.
pub fn mops_news() -> ExtractionSchema {
    ExtractionSchema::for_records(
        "tr.even, tr.odd",
        SymbolRule::Selector("td:nth-child(1)".to_string()),
    )
    .with_field(FieldRule::required(
        fields::NAME,
        "td:nth-child(2)",
        FieldType::Text,
    ))
    .with_field(FieldRule::required(
        fields::DATE,
        "td:nth-child(3)",
        FieldType::Date {
            format: DateFormat::Roc,
        },
    ))
    .with_field(FieldRule::optional(
        fields::TIME,
        "td:nth-child(4)",
        FieldType::Text,
    ))
    .with_field(FieldRule::required(
        fields::TITLE,
        "td:nth-child(5)",
        FieldType::Text,
    ))
}

/// Category names from the MoneyDJ stock-category index page.
///
/// Categories render as quarter-width cells each wrapping one link; the
/// record symbol is the category name and there are no further fields.
pub fn moneydj_category_index() -> ExtractionSchema {
    ExtractionSchema::for_records(
        r#"td[width="25%"]"#,
        SymbolRule::Selector("a".to_string()),
    )
}

/// TWSE disciplined-stock announcements (open-data JSON).
pub fn twse_punished_stocks() -> ExtractionSchema {
    ExtractionSchema::json(SymbolRule::Selector("Code".to_string()))
        .with_field(FieldRule::required(fields::NAME, "Name", FieldType::Text))
        .with_field(FieldRule::required(
            fields::DATE,
            "Date",
            FieldType::Date {
                format: DateFormat::Roc,
            },
        ))
}

/// TPEX disciplined-stock announcements (open-data JSON).
pub fn tpex_punished_stocks() -> ExtractionSchema {
    ExtractionSchema::json(SymbolRule::Selector("SecuritiesCompanyCode".to_string()))
        .with_field(FieldRule::required(
            fields::NAME,
            "CompanyName",
            FieldType::Text,
        ))
        .with_field(FieldRule::required(
            fields::DATE,
            "Date",
            FieldType::Date {
                format: DateFormat::Roc,
            },
        ))
}

/// TWSE listed-company profiles (open-data JSON).
pub fn twse_company_info() -> ExtractionSchema {
    ExtractionSchema::json(SymbolRule::Selector("公司代號".to_string()))
        .with_field(FieldRule::required(
            fields::NAME,
            "公司簡稱",
            FieldType::Text,
        ))
        .with_field(FieldRule::optional(
            fields::CAPITAL,
            "實收資本額",
            FieldType::Integer,
        ))
}

/// TPEX company profiles (open-data JSON).
pub fn tpex_company_info() -> ExtractionSchema {
    ExtractionSchema::json(SymbolRule::Selector("SecuritiesCompanyCode".to_string()))
        .with_field(FieldRule::required(
            fields::NAME,
            "CompanyName",
            FieldType::Text,
        ))
        .with_field(FieldRule::optional(
            fields::CAPITAL,
            "Paidin.Capital.NTDollars",
            FieldType::Integer,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::transport::RawResponse;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn response(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
            final_url: "https://fubon-ebrokerdj.fbs.com.tw/test".to_string(),
            fetched_at: Utc::now(),
        }
    }

    const MAIN_FORCE_PAGE: &str = r#"
        <table>
          <tr>
            <td>買超券商</td><td>買進</td><td>賣出</td><td>買超</td><td>佔比</td>
            <td>賣超券商</td><td>買進</td><td>賣出</td><td>賣超</td><td>佔比</td>
          </tr>
          <tr>
            <td>凱基台北</td><td>1,250</td><td>310</td><td>940</td><td>3.21%</td>
            <td>富邦建國</td><td>120</td><td>1,480</td><td>-1,360</td><td>4.65%</td>
          </tr>
        </table>"#;

    #[test]
    fn test_main_force_buy_side() {
        let records = parse(response(MAIN_FORCE_PAGE), &fubon_main_force_buyers()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "凱基台北");
        assert_eq!(records[0].integer(fields::BUY), Some(1250));
        assert_eq!(records[0].integer(fields::OVERBOUGHT), Some(940));
        assert_eq!(records[0].decimal(fields::PROPORTION), Some(dec!(3.21)));
    }

    #[test]
    fn test_main_force_sell_side() {
        let records = parse(response(MAIN_FORCE_PAGE), &fubon_main_force_sellers()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "富邦建國");
        assert_eq!(records[0].integer(fields::SELL), Some(1480));
        assert_eq!(records[0].integer(fields::OVERBOUGHT), Some(-1360));
    }

    #[test]
    fn test_buy_sell_history_rows() {
        let page = r#"
            <table>
              <tr><td>日期</td><td>買進</td><td>賣出</td><td>總額</td><td>買賣超</td></tr>
              <tr><td>2024/01/02</td><td>1,100</td><td>200</td><td>1,300</td><td>900</td></tr>
              <tr><td>2024/01/03</td><td>800</td><td>950</td><td>1,750</td><td>-150</td></tr>
            </table>"#;

        let records = parse(response(page), &fubon_buy_sell_history("2330")).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.symbol == "2330"));
        assert_eq!(
            records[0].date(fields::DATE),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(records[1].integer(fields::OVERBOUGHT), Some(-150));
    }

    #[test]
    fn test_mops_news_rows() {
        let page = r#"
            <table>
              <tr><th>公司代號</th><th>公司名稱</th><th>發言日期</th><th>發言時間</th><th>主旨</th></tr>
              <tr class="even">
                <td>2330</td><td>台積電</td><td>113/01/02</td><td>07:30:15</td>
                <td>本公司受邀參加法人說明會</td>
              </tr>
              <tr class="odd">
                <td>2317</td><td>鴻海</td><td>113/01/02</td><td>08:02:44</td>
                <td>公告本公司董事會決議</td>
              </tr>
            </table>"#;

        let records = parse(response(page), &mops_news()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "2330");
        assert_eq!(
            records[0].date(fields::DATE),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(records[0].text(fields::TIME), Some("07:30:15"));
        assert_eq!(
            records[1].text(fields::TITLE),
            Some("公告本公司董事會決議")
        );
    }

    #[test]
    fn test_moneydj_category_cells() {
        let page = r#"
            <table>
              <tr>
                <td width="25%"><a href="/Z/ZH/cement">水泥工業</a></td>
                <td width="25%"><a href="/Z/ZH/food">食品工業</a></td>
                <td width="25%">&nbsp;</td>
                <td width="50%">not a category cell</td>
              </tr>
            </table>"#;

        let records = parse(response(page), &moneydj_category_index()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(names, vec!["水泥工業", "食品工業"]);
    }

    #[test]
    fn test_twse_punish_json() {
        let body = r#"[
            {"Date": "1130102", "Code": "2123", "Name": "處置股份", "NumberOfAnnouncement": "1"}
        ]"#;
        let records = parse(response(body), &twse_punished_stocks()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "2123");
        assert_eq!(
            records[0].date(fields::DATE),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[test]
    fn test_company_info_json_both_exchanges() {
        let twse = r#"[{"公司代號": "2330", "公司簡稱": "台積電", "實收資本額": "259303805"}]"#;
        let records = parse(response(twse), &twse_company_info()).unwrap();
        assert_eq!(records[0].symbol, "2330");
        assert_eq!(records[0].integer(fields::CAPITAL), Some(259303805));

        let tpex = r#"[{
            "SecuritiesCompanyCode": "5483",
            "CompanyName": "中美晶",
            "Paidin.Capital.NTDollars": "5863997970"
        }]"#;
        let records = parse(response(tpex), &tpex_company_info()).unwrap();
        assert_eq!(records[0].symbol, "5483");
        assert_eq!(records[0].integer(fields::CAPITAL), Some(5863997970));
    }
}
