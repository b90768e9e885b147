//! Metric keys, display titles and guidance text for both screens.

pub const PE_RATIO: &str = "priceEarningsRatio";
pub const CURRENT_RATIO: &str = "currentRatio";
pub const QUICK_RATIO: &str = "quickRatio";
pub const DEBT_EQUITY_RATIO: &str = "debtEquityRatio";
pub const RETURN_ON_EQUITY: &str = "returnOnEquity";

pub const REVENUE_GROWTH: &str = "revenueGrowth";
pub const PRICE_TO_SALES: &str = "priceToSalesRatio";
pub const EV_OVER_REVENUE: &str = "enterpriseValueOverRevenue";
pub const GROSS_PROFIT_MARGIN: &str = "grossProfitMargin";
pub const FCF_PER_SHARE: &str = "freeCashFlowPerShare";
pub const OCF_GROWTH: &str = "operatingCashFlowGrowth";
pub const EV_TO_SALES: &str = "evToSales";
pub const EV_OVER_EBITDA: &str = "enterpriseValueOverEBITDA";
pub const EV_TO_OCF: &str = "evToOperatingCashFlow";
pub const FCF_YIELD: &str = "freeCashFlowYield";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricGuidance {
    pub key: &'static str,
    pub title: &'static str,
    pub guidance: &'static str,
}

const fn guide(key: &'static str, title: &'static str, guidance: &'static str) -> MetricGuidance {
    MetricGuidance { key, title, guidance }
}

/// Valuation screen, in display order
pub const RATIO_GUIDANCE: &[MetricGuidance] = &[
    guide(
        PE_RATIO,
        "Price-to-Earnings (P/E) Ratio",
        "Higher P/E suggests strong growth expectations. Below 15 = undervalued, 15-25 = fairly valued, above 25 = overvalued.",
    ),
    guide(
        CURRENT_RATIO,
        "Current Ratio",
        "Above 1.5 = strong liquidity, 1.0-1.5 = adequate, below 1 = potential liquidity issues.",
    ),
    guide(
        QUICK_RATIO,
        "Quick Ratio",
        "Above 1.0 = strong liquidity, 0.5-1.0 = acceptable, below 0.5 = risky.",
    ),
    guide(
        DEBT_EQUITY_RATIO,
        "Debt to Equity Ratio",
        "Below 1.0 = conservative financing, 1.0-2.0 = moderate risk, above 2.0 = highly leveraged.",
    ),
    guide(
        RETURN_ON_EQUITY,
        "Return on Equity (ROE)",
        "Above 15% = strong, 10-15% = average, below 10% = weak.",
    ),
];

/// Growth screen, in display order
pub const GROWTH_GUIDANCE: &[MetricGuidance] = &[
    guide(
        REVENUE_GROWTH,
        "Revenue Growth (YoY)",
        "Above 20% = strong, 10-20% = average, below 10% = weak.",
    ),
    guide(
        PRICE_TO_SALES,
        "Price-to-Sales (P/S) Ratio",
        "Lower is better, but high P/S may be justified by strong growth.",
    ),
    guide(
        EV_OVER_REVENUE,
        "EV/Revenue",
        "Used to value high-growth companies; compare to sector.",
    ),
    guide(
        GROSS_PROFIT_MARGIN,
        "Gross Margin (%)",
        "Above 50% = strong pricing power and scalability.",
    ),
    guide(
        FCF_PER_SHARE,
        "Free Cash Flow Per Share",
        "A positive and growing FCF is ideal for long-term sustainability.",
    ),
    guide(
        OCF_GROWTH,
        "Operating Cash Flow Growth",
        "Consistent growth indicates strong business fundamentals.",
    ),
    guide(
        EV_TO_SALES,
        "EV/Sales",
        "Enterprise Value divided by Revenue; lower is better for undervaluation.",
    ),
    guide(
        EV_OVER_EBITDA,
        "EV/EBITDA",
        "Enterprise Value over EBITDA; lower values indicate undervaluation.",
    ),
    guide(
        EV_TO_OCF,
        "EV/Operating Cash Flow",
        "Measures how expensive a company is relative to cash flow.",
    ),
    guide(
        FCF_YIELD,
        "Free Cash Flow Yield",
        "Higher values indicate strong free cash flow compared to market cap.",
    ),
];
