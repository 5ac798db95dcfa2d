#![no_main]

use libfuzzer_sys::fuzz_target;
use mode_resizer::{AlphaMulDiv, CpuCapability, PixelFormat};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, pixels)) = data.split_first() else {
        return;
    };
    let format = match selector % 4 {
        0 => PixelFormat::U8x2,
        1 => PixelFormat::U8x4,
        2 => PixelFormat::U16x2,
        _ => PixelFormat::U16x4,
    };
    let len = pixels.len() - pixels.len() % format.size();
    let pixels = &pixels[..len];

    let mut reference = AlphaMulDiv::new();
    reference.set_cpu_capability(CpuCapability::None);
    let mut fast = AlphaMulDiv::new();
    fast.set_cpu_capability(CpuCapability::detect_best_supported());

    let mut expected = vec![0u8; len];
    let mut actual = pixels.to_vec();
    if selector & 0x80 == 0 {
        reference
            .multiply_alpha_pixels(format, pixels, &mut expected, None)
            .unwrap();
        fast.multiply_alpha_pixels_inplace(format, &mut actual, None)
            .unwrap();
    } else {
        reference
            .divide_alpha_pixels(format, pixels, &mut expected, None)
            .unwrap();
        fast.divide_alpha_pixels_inplace(format, &mut actual, None)
            .unwrap();
    }
    assert_eq!(actual, expected);
});
