//! Writing gear outlines as SVG or DXF.

use crate::error::Result;
use crate::geometry::Point;
use crate::geometry::Polyline;
use crate::outline::GearOutline;
use dxf::entities::Entity;
use dxf::entities::EntityType;
use dxf::entities::Line;
use dxf::Drawing;
use ordered_float::OrderedFloat;
use std::io::Write;

/// The DXF layer of the gear lines.
pub const DXF_LAYER: &str = "GEAR";

/// How to scale an axis of the output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scale {
    /// Scale to ensure a given total size.
    Size(f64),

    /// Scale by a fixed factor.
    Factor(f64),

    /// Use the same scale factor as the other axis.
    Same,
}

/// Return the minimal coordinates in some paths.
pub fn minimal_coordinates(polylines: &[Polyline]) -> Point {
    let points = || polylines.iter().flat_map(|polyline| polyline.iter());
    Point {
        x: points()
            .map(|point| OrderedFloat(point.x))
            .min()
            .map_or(0.0, |x| x.0),
        y: points()
            .map(|point| OrderedFloat(point.y))
            .min()
            .map_or(0.0, |y| y.0),
    }
}

/// Return the maximal coordinates in some paths.
pub fn maximal_coordinates(polylines: &[Polyline]) -> Point {
    let points = || polylines.iter().flat_map(|polyline| polyline.iter());
    Point {
        x: points()
            .map(|point| OrderedFloat(point.x))
            .max()
            .map_or(0.0, |x| x.0),
        y: points()
            .map(|point| OrderedFloat(point.y))
            .max()
            .map_or(0.0, |y| y.0),
    }
}

/// Scale and move the points to fit in a (0,0) -> (w,h) bounding box.
pub fn transform(polylines: &mut [Polyline], x_scale: Scale, y_scale: Scale) {
    let minimal_point = minimal_coordinates(polylines);
    let maximal_point = maximal_coordinates(polylines);
    let size = Point {
        x: maximal_point.x - minimal_point.x,
        y: maximal_point.y - minimal_point.y,
    };

    let maybe_x_factor = match x_scale {
        Scale::Size(x_size) => Some(if size.x > 0.0 { x_size / size.x } else { 1.0 }),
        Scale::Factor(factor) => Some(factor),
        Scale::Same => None,
    };

    let maybe_y_factor = match y_scale {
        Scale::Size(y_size) => Some(if size.y > 0.0 { y_size / size.y } else { 1.0 }),
        Scale::Factor(factor) => Some(factor),
        Scale::Same => None,
    };

    let (x_factor, y_factor) = match (maybe_x_factor, maybe_y_factor) {
        (None, None) => (1.0, 1.0),
        (None, Some(y_factor)) => (y_factor, y_factor),
        (Some(x_factor), None) => (x_factor, x_factor),
        (Some(x_factor), Some(y_factor)) => (x_factor, y_factor),
    };

    for polyline in polylines.iter_mut() {
        for point in polyline.iter_mut() {
            point.x = (point.x - minimal_point.x) * x_factor;
            point.y = (point.y - minimal_point.y) * y_factor;
        }
    }
}

fn print_svg_polyline(polyline: &[Point], output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "<path fill='none' stroke='black' stroke-width='0.1' d='"
    )?;
    let mut command = "M";
    for point in polyline {
        writeln!(output, "{} {} {}", command, point.x, point.y)?;
        command = "L";
    }
    writeln!(output, "'/>")?;
    Ok(())
}

/// Print gear outlines as an SVG file, one path per segment.
pub fn print_svg_outlines(
    outlines: &[GearOutline],
    x_scale: Scale,
    y_scale: Scale,
    output: &mut dyn Write,
) -> Result<()> {
    let mut polylines: Vec<Polyline> = outlines
        .iter()
        .flat_map(|outline| outline.polylines())
        .collect();
    transform(&mut polylines, x_scale, y_scale);

    let maximal_point = maximal_coordinates(&polylines);
    writeln!(
        output,
        "<svg width='{}pt' height='{}pt' xmlns='http://www.w3.org/2000/svg'>",
        maximal_point.x, maximal_point.y
    )?;

    writeln!(output, "<g transform='scale(1.333333 1.333333)'>")?;

    for polyline in &polylines {
        print_svg_polyline(polyline, output)?;
    }

    writeln!(output, "</g>")?;
    writeln!(output, "</svg>")?;
    output.flush()?;
    Ok(())
}

/// Collect gear outlines into a DXF drawing of lines, extruded by the outline depth.
pub fn dxf_drawing(outlines: &[GearOutline]) -> Drawing {
    let mut drawing = Drawing::new();
    for outline in outlines {
        for (from, to) in outline.segments() {
            let mut line = Line::new(
                dxf::Point::new(from.x, from.y, 0.0),
                dxf::Point::new(to.x, to.y, 0.0),
            );
            line.thickness = outline.depth();
            let mut entity = Entity::new(EntityType::Line(line));
            entity.common.layer = DXF_LAYER.to_string();
            drawing.add_entity(entity);
        }
    }
    drawing
}

/// Write gear outlines as a DXF file.
pub fn write_dxf_outlines(outlines: &[GearOutline], output: &mut dyn Write) -> Result<()> {
    let mut buffer = Vec::new();
    dxf_drawing(outlines).save(&mut buffer)?;
    output.write_all(&buffer)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
use crate::geometry::assert_point;

#[cfg(test)]
fn square(size: f64, depth: f64) -> GearOutline {
    let corners = [
        Point { x: 0.0, y: 0.0 },
        Point { x: size, y: 0.0 },
        Point { x: size, y: size },
        Point { x: 0.0, y: size },
    ];
    GearOutline::new(
        (0..4)
            .map(|index| (corners[index], corners[(index + 1) % 4]))
            .collect(),
        depth,
    )
}

#[cfg(test)]
#[test]
fn test_transform() {
    let mut polylines = vec![vec![
        Point { x: -1.0, y: 0.0 },
        Point { x: 0.0, y: -1.0 },
        Point { x: 1.0, y: 0.0 },
        Point { x: 0.0, y: 1.0 },
    ]];

    transform(&mut polylines, Scale::Same, Scale::Same);
    assert_point(polylines[0][0], 0.0, 1.0);
    assert_point(polylines[0][2], 2.0, 1.0);

    transform(&mut polylines, Scale::Factor(2.0), Scale::Same);
    assert_point(polylines[0][1], 2.0, 0.0);
    assert_point(polylines[0][3], 2.0, 4.0);

    transform(&mut polylines, Scale::Size(3.0), Scale::Factor(0.5));
    assert_point(polylines[0][0], 0.0, 1.0);
    assert_point(polylines[0][2], 3.0, 1.0);

    let mut empty: Vec<Polyline> = vec![];
    transform(&mut empty, Scale::Size(1.0), Scale::Same);
    assert_point(maximal_coordinates(&empty), 0.0, 0.0);
}

#[cfg(test)]
#[test]
fn test_svg_parses_back() {
    let outlines = vec![
        square(1.0, 0.2),
        square(1.0, 0.2).translated(Point { x: 2.0, y: 0.0 }),
    ];
    let mut output = Vec::new();
    print_svg_outlines(&outlines, Scale::Size(30.0), Scale::Same, &mut output).unwrap();

    let svg = String::from_utf8(output).unwrap();
    assert!(svg.starts_with("<svg width='30pt' height='10pt'"));

    let polylines = svg2polylines::parse(&svg).unwrap();
    assert!(polylines.len() == 8);
    assert!(polylines.iter().all(|polyline| polyline.len() == 2));
    assert_point(polylines[0][0], 0.0, 0.0);
    assert_point(polylines[0][1], 10.0, 0.0);
    assert_point(polylines[4][0], 20.0, 0.0);
}

#[cfg(test)]
#[test]
fn test_dxf_lines() {
    let drawing = dxf_drawing(&[square(1.0, 0.2), square(2.0, 0.5)]);
    let lines: Vec<_> = drawing
        .entities()
        .filter_map(|entity| match &entity.specific {
            EntityType::Line(line) => Some((entity.common.layer.clone(), line.clone())),
            _ => None,
        })
        .collect();
    assert!(lines.len() == 8);
    assert!(lines.iter().all(|(layer, _)| layer == DXF_LAYER));
    assert!(lines[0].1.thickness == 0.2);
    assert!(lines[7].1.thickness == 0.5);
    assert!(lines[5].1.p1.x == 2.0 && lines[5].1.p2.y == 2.0);

    let mut output = Vec::new();
    write_dxf_outlines(&[square(1.0, 0.2)], &mut output).unwrap();
    assert!(String::from_utf8_lossy(&output).contains("LINE"));
}
