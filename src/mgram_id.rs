/*
 *  Copyright (c) 2021 Works Applications Co., Ltd.
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Byte-packed M-gram id codec used by the G2D map trie (spec.md §4.2).
//!
//! Each word id is stored in the minimum whole number of bytes it needs
//! (`1..=W`, `W = size_of::<u32>() = 4`). A mixed-radix *type* prefix,
//! base `W`, records how many bytes each of the `M` word ids occupies so
//! decoding knows exactly where the word boundaries fall.

use crate::word_index::WordId;

/// Byte width of the word id representation.
pub const W: usize = std::mem::size_of::<u32>();

/// Minimum whole bytes needed to represent `id`, in `1..=W`.
#[inline]
pub fn byte_length(id: u32) -> usize {
    if id == 0 {
        return 1;
    }
    let bits_used = 32 - id.leading_zeros() as usize;
    bits_used.div_ceil(8).max(1)
}

/// Number of bytes needed for the type prefix of an `m`-word id, i.e.
/// `ceil(log2(W^m) / 8)`.
pub fn type_byte_length(m: usize) -> usize {
    if m == 0 {
        return 0;
    }
    let bits = (m as f64) * (W as f64).log2();
    ((bits / 8.0).ceil() as usize).max(1)
}

/// Encodes `word_ids` (1..=7 of them) as a byte-packed m-gram id: a
/// mixed-radix type prefix followed by each word id in its minimal
/// big-endian byte representation (big-endian so that `memcmp` over the
/// word bytes matches numeric order, preserving lexicographic ordering
/// within a fixed type per spec.md §4.2).
pub fn pack(word_ids: &[WordId]) -> Vec<u8> {
    let m = word_ids.len();
    let lengths: Vec<usize> = word_ids.iter().map(|w| byte_length(w.as_raw())).collect();

    // mixed-radix digits (length - 1, each in 0..W) combined base-W,
    // first word is the least-significant digit.
    let mut type_value: u64 = 0;
    for (i, len) in lengths.iter().enumerate() {
        type_value += ((*len - 1) as u64) * (W as u64).pow(i as u32);
    }

    let type_bytes = type_byte_length(m);
    let mut out = Vec::with_capacity(type_bytes + lengths.iter().sum::<usize>());
    out.extend_from_slice(&type_value.to_le_bytes()[..type_bytes]);

    for (word_id, len) in word_ids.iter().zip(lengths.iter()) {
        let be = word_id.as_raw().to_be_bytes();
        out.extend_from_slice(&be[W - len..]);
    }
    out
}

/// Decodes a byte-packed m-gram id of `m` words back into word ids.
/// `m` must be the same value used to `pack` the id.
pub fn unpack(bytes: &[u8], m: usize) -> Vec<WordId> {
    let type_bytes = type_byte_length(m);
    let mut type_value: u64 = 0;
    for (i, &b) in bytes[..type_bytes].iter().enumerate() {
        type_value |= (b as u64) << (8 * i);
    }

    let mut lengths = Vec::with_capacity(m);
    let mut remaining = type_value;
    for _ in 0..m {
        lengths.push((remaining % W as u64) as usize + 1);
        remaining /= W as u64;
    }

    let mut offset = type_bytes;
    let mut result = Vec::with_capacity(m);
    for len in lengths {
        let mut buf = [0u8; W];
        buf[W - len..].copy_from_slice(&bytes[offset..offset + len]);
        result.push(WordId::from_raw(u32::from_be_bytes(buf)));
        offset += len;
    }
    result
}

/// Total encoded length, in bytes, of an m-gram id for `word_ids`.
pub fn packed_len(word_ids: &[WordId]) -> usize {
    type_byte_length(word_ids.len())
        + word_ids
            .iter()
            .map(|w| byte_length(w.as_raw()))
            .sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_length_boundaries() {
        assert_eq!(byte_length(0), 1);
        assert_eq!(byte_length(0xff), 1);
        assert_eq!(byte_length(0x100), 2);
        assert_eq!(byte_length(0xffff), 2);
        assert_eq!(byte_length(0x1_0000), 3);
        assert_eq!(byte_length(0x00ff_ffff), 3);
        assert_eq!(byte_length(0x0100_0000), 4);
        assert_eq!(byte_length(u32::MAX), 4);
    }

    #[test]
    fn pack_unpack_round_trip() {
        let cases: Vec<Vec<WordId>> = vec![
            vec![WordId::from_raw(0)],
            vec![WordId::from_raw(5), WordId::from_raw(300)],
            vec![
                WordId::from_raw(1),
                WordId::from_raw(0x1_0000),
                WordId::from_raw(70000),
            ],
            vec![
                WordId::from_raw(1),
                WordId::from_raw(2),
                WordId::from_raw(3),
                WordId::from_raw(4),
                WordId::from_raw(5),
            ],
        ];
        for ids in cases {
            let packed = pack(&ids);
            assert_eq!(packed.len(), packed_len(&ids));
            let unpacked = unpack(&packed, ids.len());
            assert_eq!(
                unpacked.iter().map(WordId::as_raw).collect::<Vec<_>>(),
                ids.iter().map(WordId::as_raw).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn fixed_type_preserves_lexicographic_order() {
        // same byte-length per word (type is fixed) -> memcmp orders by value
        let a = vec![WordId::from_raw(10), WordId::from_raw(20)];
        let b = vec![WordId::from_raw(10), WordId::from_raw(30)];
        let c = vec![WordId::from_raw(11), WordId::from_raw(5)];

        let pa = pack(&a);
        let pb = pack(&b);
        let pc = pack(&c);

        assert!(pa < pb);
        assert!(pb < pc);
    }
}
