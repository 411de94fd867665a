//! Hilbert-curve visitation of arbitrary rectangles
//!
//! A rectangle is cut into horizontal bands (vertical when it is taller than
//! wide). Each band is a power of two high and is tiled with Hilbert squares;
//! the columns left over at the end are walked as a serpentine. Bands run in
//! alternating directions so one band usually ends right above the start of
//! the next.

/// Unit move of the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    /// (dx, dy) with y growing downwards
    #[inline]
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Right => (1, 0),
        }
    }

    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Right => Direction::Left,
        }
    }

    /// Mirror across the main diagonal
    #[inline]
    pub fn transposed(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Down,
        }
    }
}

/// Entry and exit corners of one Hilbert square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    TopLeftTopRight,
    BottomRightBottomLeft,
    TopLeftBottomLeft,
    BottomRightTopRight,
}

impl Rotation {
    /// Map a move of the top-left to top-right curve into this rotation
    #[inline]
    pub fn map(self, dir: Direction) -> Direction {
        match self {
            Rotation::TopLeftTopRight => dir,
            Rotation::BottomRightBottomLeft => dir.reversed(),
            Rotation::TopLeftBottomLeft => dir.transposed(),
            Rotation::BottomRightTopRight => dir.transposed().reversed(),
        }
    }
}

/// Something driven along a visitation path
pub trait Walker {
    /// Visit the pixel under the cursor, then move one step
    fn step(&mut self, dir: Direction);

    /// Jump to (x, y) without visiting anything
    fn seek(&mut self, x: u32, y: u32);
}

/// Walk one `2^level` square from its entry corner
///
/// Emits `4^level - 1` steps; the cursor ends on the exit corner, which has
/// not been visited yet.
pub fn curve<W: Walker + ?Sized>(walker: &mut W, level: u32, rotation: Rotation) {
    hilbert(walker, level, Direction::Up, rotation);
}

fn hilbert<W: Walker + ?Sized>(walker: &mut W, level: u32, heading: Direction, rotation: Rotation) {
    if level == 0 {
        return;
    }
    use Direction::*;
    let (subs, moves) = match heading {
        Left => ([Up, Left, Left, Down], [Right, Down, Left]),
        Right => ([Down, Right, Right, Up], [Left, Up, Right]),
        Up => ([Left, Up, Up, Right], [Down, Right, Up]),
        Down => ([Right, Down, Down, Left], [Up, Left, Down]),
    };
    hilbert(walker, level - 1, subs[0], rotation);
    for i in 0..3 {
        walker.step(rotation.map(moves[i]));
        hilbert(walker, level - 1, subs[i + 1], rotation);
    }
}

/// Visit every pixel of a `width` x `height` rectangle exactly once
pub fn walk<W: Walker + ?Sized>(width: u32, height: u32, walker: &mut W) {
    if width == 0 || height == 0 {
        return;
    }
    if height > width {
        walk_bands(height, width, &mut Transposed(walker));
    } else {
        walk_bands(width, height, walker);
    }
}

/// Swaps the axes of every move and seek
struct Transposed<'a, W: Walker + ?Sized>(&'a mut W);

impl<W: Walker + ?Sized> Walker for Transposed<'_, W> {
    fn step(&mut self, dir: Direction) {
        self.0.step(dir.transposed());
    }

    fn seek(&mut self, x: u32, y: u32) {
        self.0.seek(y, x);
    }
}

/// One horizontal band: `size` rows starting at `top`
#[derive(Debug, Clone, Copy)]
struct Band {
    top: u32,
    size: u32,
    squares: u32,
    rest: u32,
    forward: bool,
}

impl Band {
    fn new(width: u32, height: u32, top: u32, forward: bool) -> Self {
        let size = prev_power_of_two((height - top).min(width));
        Self {
            top,
            size,
            squares: width / size,
            rest: width % size,
            forward,
        }
    }

    fn bottom(&self) -> u32 {
        self.top + self.size - 1
    }

    fn start(&self, width: u32) -> (u32, u32) {
        if self.forward {
            (0, self.top)
        } else if self.rest % 2 == 1 {
            (width - 1, self.top)
        } else {
            (width - 1, self.bottom())
        }
    }

    fn end(&self, width: u32) -> (u32, u32) {
        if !self.forward {
            (0, self.bottom())
        } else if self.rest % 2 == 1 {
            (width - 1, self.bottom())
        } else {
            (width - 1, self.top)
        }
    }

    fn walk<W: Walker + ?Sized>(&self, walker: &mut W) {
        let level = self.size.trailing_zeros();
        if self.forward {
            for i in 0..self.squares {
                if i > 0 {
                    walker.step(Direction::Right);
                }
                curve(walker, level, Rotation::TopLeftTopRight);
            }
            if self.rest > 0 {
                walker.step(Direction::Right);
                for c in 0..self.rest {
                    if c > 0 {
                        walker.step(Direction::Right);
                    }
                    let dir = if c % 2 == 0 { Direction::Down } else { Direction::Up };
                    self.column(walker, dir);
                }
            }
        } else {
            let first = if self.rest % 2 == 1 { Direction::Down } else { Direction::Up };
            for c in 0..self.rest {
                let dir = if c % 2 == 0 { first } else { first.reversed() };
                self.column(walker, dir);
                walker.step(Direction::Left);
            }
            for i in 0..self.squares {
                if i > 0 {
                    walker.step(Direction::Left);
                }
                curve(walker, level, Rotation::BottomRightBottomLeft);
            }
        }
    }

    fn column<W: Walker + ?Sized>(&self, walker: &mut W, dir: Direction) {
        for _ in 1..self.size {
            walker.step(dir);
        }
    }
}

fn walk_bands<W: Walker + ?Sized>(width: u32, height: u32, walker: &mut W) {
    walker.seek(0, 0);
    let mut band = Band::new(width, height, 0, true);
    loop {
        band.walk(walker);
        let top = band.top + band.size;
        if top >= height {
            break;
        }
        let next = Band::new(width, height, top, !band.forward);
        let (ex, ey) = band.end(width);
        let (sx, sy) = next.start(width);
        walker.step(Direction::Down);
        if (sx, sy) != (ex, ey + 1) {
            walker.seek(sx, sy);
        }
        band = next;
    }
    // the exit pixel of the last band is still pending
    walker.step(Direction::Right);
}

#[inline]
fn prev_power_of_two(v: u32) -> u32 {
    debug_assert!(v > 0);
    1 << (31 - v.leading_zeros())
}
