// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Conversions between [`BigDecimal`] and the `decimal` logical type.

use crate::{AvroResult, error::Details};
pub use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use std::str::FromStr;

/// The unscaled two's-complement big-endian bytes of `decimal` at the given `scale`.
///
/// A value with non-zero digits beyond `scale` is rejected.
pub(crate) fn decimal_to_bytes(
    decimal: &BigDecimal,
    precision: usize,
    scale: usize,
) -> AvroResult<Vec<u8>> {
    let rescaled = decimal.with_scale(scale as i64);
    if rescaled != *decimal {
        let (_, actual) = decimal.normalized().as_bigint_and_exponent();
        return Err(Details::DecimalScale { scale, actual }.into());
    }
    let digits = rescaled.digits();
    if digits > precision as u64 {
        return Err(Details::DecimalPrecision { digits, precision }.into());
    }
    let (unscaled, _) = rescaled.into_bigint_and_exponent();
    Ok(unscaled.to_signed_bytes_be())
}

/// Like [`decimal_to_bytes`], sign extended to exactly `len` bytes for a `fixed` schema.
pub(crate) fn decimal_to_fixed(
    decimal: &BigDecimal,
    precision: usize,
    scale: usize,
    len: usize,
) -> AvroResult<Vec<u8>> {
    let raw_bytes = decimal_to_bytes(decimal, precision, scale)?;
    sign_extend(&raw_bytes, decimal.sign() == Sign::Minus, len)
}

pub(crate) fn sign_extend(raw_bytes: &[u8], negative: bool, len: usize) -> AvroResult<Vec<u8>> {
    let sign_byte = 0xFF * u8::from(negative);
    let mut extended = vec![sign_byte; len];
    let start_byte_index = len.checked_sub(raw_bytes.len()).ok_or(Details::SignExtend {
        requested: len,
        needed: raw_bytes.len(),
    })?;
    extended[start_byte_index..].copy_from_slice(raw_bytes);
    Ok(extended)
}

pub(crate) fn decimal_from_bytes(bytes: &[u8], scale: usize) -> BigDecimal {
    BigDecimal::new(BigInt::from_signed_bytes_be(bytes), scale as i64)
}

/// Decimal notation without exponent, as used when a decimal is stored in a `string`.
pub(crate) fn decimal_to_plain_string(decimal: &BigDecimal) -> String {
    decimal.to_plain_string()
}

pub(crate) fn decimal_from_str(value: &str) -> AvroResult<BigDecimal> {
    BigDecimal::from_str(value).map_err(|e| Details::ParseBigDecimal(e).into())
}
