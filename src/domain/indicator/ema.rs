//! Exponential Moving Average indicator.
//!
//! alpha = 2/(n+1). EMA[i] is the alpha-decayed weighted mean of every price
//! up to i, normalised by the sum of the weights it actually used:
//!   num[i] = P[i] + (1-alpha)*num[i-1],  den[i] = 1 + (1-alpha)*den[i-1]
//!   EMA[i] = num[i] / den[i]
//! There is no warm-up: EMA[0] = P[0]. A NaN price still decays the older
//! weights but adds none, so it repeats the previous value; positions before
//! the first priced one are NaN.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_ema(prices: &[f64], span: usize) -> IndicatorSeries {
    let values = if span == 0 {
        vec![f64::NAN; prices.len()]
    } else {
        let decay = 1.0 - 2.0 / (span as f64 + 1.0);
        let mut num = 0.0;
        let mut den = 0.0;

        prices
            .iter()
            .map(|&price| {
                num *= decay;
                den *= decay;
                if !price.is_nan() {
                    num += price;
                    den += 1.0;
                }
                if den > 0.0 { num / den } else { f64::NAN }
            })
            .collect()
    };

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(span),
        values,
    }
}
