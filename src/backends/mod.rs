use cfg_if::cfg_if;

pub(crate) mod soft;

cfg_if! {
    if #[cfg(all(feature = "chacha_simd", not(chacha20_force_soft)))] {
        pub(crate) mod simd;
    }
}
