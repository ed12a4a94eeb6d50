use image::{imageops::FilterType, DynamicImage, GrayImage, RgbImage};

/// Longest edge of the thumbnail the smart-crop strategies score.
const ANALYSIS_EDGE: u32 = 256;

/// Number of candidate windows tried along the overflowing axis.
const CANDIDATES: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Center,
}

impl Gravity {
    pub fn from_keyword(s: &str) -> Option<Gravity> {
        let g = match s {
            "north" => Gravity::North,
            "northeast" => Gravity::NorthEast,
            "east" => Gravity::East,
            "southeast" => Gravity::SouthEast,
            "south" => Gravity::South,
            "southwest" => Gravity::SouthWest,
            "west" => Gravity::West,
            "northwest" => Gravity::NorthWest,
            "center" | "centre" => Gravity::Center,
            _ => return None,
        };
        Some(g)
    }

    /// Horizontal and vertical position of the kept window inside the free
    /// space, 0.0 being left/top and 1.0 right/bottom.
    pub fn anchor(self) -> (f64, f64) {
        match self {
            Gravity::North => (0.5, 0.0),
            Gravity::NorthEast => (1.0, 0.0),
            Gravity::East => (1.0, 0.5),
            Gravity::SouthEast => (1.0, 1.0),
            Gravity::South => (0.5, 1.0),
            Gravity::SouthWest => (0.0, 1.0),
            Gravity::West => (0.0, 0.5),
            Gravity::NorthWest => (0.0, 0.0),
            Gravity::Center => (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Keep the window whose luminance histogram carries the most entropy.
    Entropy,
    /// Keep the window with the most edges and saturated color.
    Attention,
}

impl Strategy {
    pub fn from_keyword(s: &str) -> Option<Strategy> {
        match s {
            "entropy" => Some(Strategy::Entropy),
            "attention" => Some(Strategy::Attention),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    Gravity(Gravity),
    Strategy(Strategy),
}

impl CropMode {
    /// Unknown keywords yield `None`, never an error.
    pub fn from_keyword(s: &str) -> Option<CropMode> {
        Gravity::from_keyword(s)
            .map(CropMode::Gravity)
            .or_else(|| Strategy::from_keyword(s).map(CropMode::Strategy))
    }
}

/// Region of the source image, in source pixels, that gets scaled into the
/// destination box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest window with the destination's aspect ratio that fits the source.
/// Returned at the top-left corner, the caller positions it.
fn cover_window(src: (u32, u32), dst: (u32, u32)) -> Window {
    let (sw, sh) = (src.0 as f64, src.1 as f64);
    let (dw, dh) = (dst.0 as f64, dst.1 as f64);
    let scale = (dw / sw).max(dh / sh);
    Window {
        left: 0.0,
        top: 0.0,
        width: (dw / scale).min(sw),
        height: (dh / scale).min(sh),
    }
}

/// Picks the part of `src` that survives a cover resize into `dst`.
pub fn select_window(src: &DynamicImage, dst: (u32, u32), mode: Option<CropMode>) -> Window {
    let size = (src.width(), src.height());
    match mode {
        Some(CropMode::Strategy(strategy)) => smart_window(src, dst, strategy),
        Some(CropMode::Gravity(gravity)) => gravity_window(size, dst, gravity),
        None => gravity_window(size, dst, Gravity::Center),
    }
}

pub fn gravity_window(src: (u32, u32), dst: (u32, u32), gravity: Gravity) -> Window {
    let mut w = cover_window(src, dst);
    let (ax, ay) = gravity.anchor();
    w.left = (src.0 as f64 - w.width) * ax;
    w.top = (src.1 as f64 - w.height) * ay;
    w
}

fn smart_window(src: &DynamicImage, dst: (u32, u32), strategy: Strategy) -> Window {
    let size = (src.width(), src.height());
    let mut window = cover_window(size, dst);
    let free_x = size.0 as f64 - window.width;
    let free_y = size.1 as f64 - window.height;
    if free_x < 1.0 && free_y < 1.0 {
        return gravity_window(size, dst, Gravity::Center);
    }

    let thumb = src.resize(ANALYSIS_EDGE, ANALYSIS_EDGE, FilterType::Triangle);
    let ratio = thumb.width() as f64 / size.0 as f64;
    let map = match strategy {
        Strategy::Entropy => ScoreMap::Luma(thumb.to_luma8()),
        Strategy::Attention => ScoreMap::Saliency(saliency(&thumb.to_rgb8())),
    };

    let mut best = (f64::MIN, 0.0);
    for i in 0..=CANDIDATES {
        let t = i as f64 / CANDIDATES as f64;
        let (left, top) = if free_x >= free_y {
            (free_x * t, free_y * 0.5)
        } else {
            (free_x * 0.5, free_y * t)
        };
        let score = map.score(
            (left * ratio) as u32,
            (top * ratio) as u32,
            ((window.width * ratio) as u32).max(1),
            ((window.height * ratio) as u32).max(1),
        );
        if score > best.0 {
            best = (score, t);
        }
    }

    if free_x >= free_y {
        window.left = free_x * best.1;
        window.top = free_y * 0.5;
    } else {
        window.left = free_x * 0.5;
        window.top = free_y * best.1;
    }
    window
}

enum ScoreMap {
    Luma(GrayImage),
    Saliency(Vec<Vec<f64>>),
}

impl ScoreMap {
    fn score(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        match self {
            ScoreMap::Luma(img) => {
                let mut hist = [0u64; 256];
                let x1 = (x + w).min(img.width());
                let y1 = (y + h).min(img.height());
                for py in y..y1 {
                    for px in x..x1 {
                        hist[img.get_pixel(px, py).0[0] as usize] += 1;
                    }
                }
                entropy(&hist)
            }
            ScoreMap::Saliency(rows) => {
                let mut sum = 0.0;
                for row in rows.iter().skip(y as usize).take(h as usize) {
                    sum += row.iter().skip(x as usize).take(w as usize).sum::<f64>();
                }
                sum
            }
        }
    }
}

fn entropy(hist: &[u64; 256]) -> f64 {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    hist.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Per-pixel interest: local gradient magnitude plus color saturation.
fn saliency(img: &RgbImage) -> Vec<Vec<f64>> {
    let (w, h) = img.dimensions();
    let luma = |x: u32, y: u32| {
        let [r, g, b] = img.get_pixel(x, y).0;
        0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
    };

    (0..h)
        .map(|y| {
            (0..w)
                .map(|x| {
                    let l = luma(x, y);
                    let dx = if x + 1 < w { (luma(x + 1, y) - l).abs() } else { 0.0 };
                    let dy = if y + 1 < h { (luma(x, y + 1) - l).abs() } else { 0.0 };
                    let [r, g, b] = img.get_pixel(x, y).0;
                    let max = r.max(g).max(b) as f64;
                    let min = r.min(g).min(b) as f64;
                    let sat = if max > 0.0 { (max - min) / max } else { 0.0 };
                    dx + dy + sat * 64.0
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn keywords() {
        assert_eq!(
            CropMode::from_keyword("north"),
            Some(CropMode::Gravity(Gravity::North))
        );
        assert_eq!(
            CropMode::from_keyword("centre"),
            Some(CropMode::Gravity(Gravity::Center))
        );
        assert_eq!(
            CropMode::from_keyword("entropy"),
            Some(CropMode::Strategy(Strategy::Entropy))
        );
        assert_eq!(CropMode::from_keyword("North"), None);
        assert_eq!(CropMode::from_keyword("top"), None);
        assert_eq!(CropMode::from_keyword(""), None);
    }

    #[test]
    fn gravity_positions_window_in_free_space() {
        // 400x200 into 100x100: keep a 200x200 square
        let w = gravity_window((400, 200), (100, 100), Gravity::West);
        assert_eq!(w, Window { left: 0.0, top: 0.0, width: 200.0, height: 200.0 });

        let w = gravity_window((400, 200), (100, 100), Gravity::East);
        assert_eq!(w.left, 200.0);

        let w = gravity_window((400, 200), (100, 100), Gravity::Center);
        assert_eq!(w.left, 100.0);

        // tall source, north keeps the top rows
        let w = gravity_window((100, 300), (100, 100), Gravity::North);
        assert_eq!(w, Window { left: 0.0, top: 0.0, width: 100.0, height: 100.0 });
        let w = gravity_window((100, 300), (100, 100), Gravity::South);
        assert_eq!(w.top, 200.0);
    }

    #[test]
    fn strategies_prefer_the_busy_half() {
        // left half flat grey, right half noisy colored pattern
        let img = RgbImage::from_fn(200, 100, |x, y| {
            if x < 100 {
                Rgb([128, 128, 128])
            } else {
                let v = ((x * 37 + y * 91) % 256) as u8;
                Rgb([v, 255 - v, (v / 2).wrapping_add(60)])
            }
        });
        let img = DynamicImage::ImageRgb8(img);

        for strategy in [Strategy::Entropy, Strategy::Attention] {
            let w = select_window(&img, (50, 50), Some(CropMode::Strategy(strategy)));
            assert_eq!(w.width, 100.0);
            assert!(w.left > 50.0, "{strategy:?} picked left={}", w.left);
        }
    }

    #[test]
    fn no_overflow_means_whole_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(80, 40));
        let w = select_window(&img, (40, 20), Some(CropMode::Strategy(Strategy::Entropy)));
        assert_eq!(w, Window { left: 0.0, top: 0.0, width: 80.0, height: 40.0 });
    }
}
