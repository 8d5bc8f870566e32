//! Functions for implementing the executable gearpair program.

use crate::compute_gear;
use crate::compute_gear_pair;
use crate::compute_offset_pair;
use crate::curve::PitchCurve;
use crate::error::GearsError;
use crate::error::Result;
use crate::options::ConjugateParams;
use crate::options::Options;
use crate::outline::GearOutline;
use crate::output::print_svg_outlines;
use crate::output::write_dxf_outlines;
use crate::output::Scale;
use clap::crate_version;
use clap::App;
use clap::Arg;
use clap::ArgMatches;
use log::info;
use std::fs::File;
use std::io::stdout;
use std::io::BufWriter;
use std::io::Write;

/// A complete main function for the gearpair program.
pub fn main(flags: &[String]) -> Result<()> {
    let arg_matches = app().get_matches_from(flags);

    let options = arg_options(&arg_matches)?;
    let curve = parse_curve(&arg_matches)?;

    let outlines = if arg_matches.is_present("single") {
        vec![compute_gear(&curve, &options)?.outline]
    } else if arg_matches.is_present("offset") {
        let pair = compute_offset_pair(&curve, &options)?;
        info!("center distance: {}", pair.center_distance);
        vec![pair.gear, pair.mate]
    } else {
        let params = ConjugateParams {
            center_distance: parse_value(&arg_matches, "center-distance")?,
            inner_radius: parse_value(&arg_matches, "conjugate-inner-radius")?,
        };
        let pair = compute_gear_pair(&curve, &params, &options)?;
        info!("center distance: {}", pair.center_distance);
        vec![pair.gear, pair.conjugate]
    };

    let output_path = arg_matches.value_of("output").unwrap_or("-");
    if output_path == "-" {
        write_outlines(&arg_matches, &outlines, &mut BufWriter::new(stdout())) // NOT TESTED
    } else {
        write_outlines(
            &arg_matches,
            &outlines,
            &mut BufWriter::new(File::create(output_path)?),
        )
    }
}

fn app() -> App<'static, 'static> {
    App::new("gearpair")
        .about("\nConjugate (possibly non-circular) gear pairs.")
        .after_help(
            "\
            PROCESS:\n\
            \n\
            - Generate a closed pitch curve: a circle, an ellipse around its focus\n  \
              (possibly repeated several times per turn), or a superellipse.\n\
            \n\
            - Find the circular pitch which fits exactly the requested number of teeth\n  \
              along the root curve, and place alternating tooth and gap anchors.\n\
            \n\
            - Unless generating a single gear, search for the distance between the axes\n  \
              at which a conjugate gear, with one tooth in each gap of the first gear\n  \
              (per turn of the first gear), closes after exactly one turn.\n\
            \n\
            - Alternatively, pair the gear with a copy of itself turned to face it with\n  \
              its most different radius, with teeth where the first gear has gaps.\n\
            \n\
            - Build an involute tooth at each tooth anchor, clipping tooth tips\n  \
              so the two sides of a tooth do not cross.\n\
            \n\
            - Connect the teeth with root arcs and add the bore circle.\n\
            \n\
            - Print the line segments as an SVG or DXF file.\
            ",
        )
        .version(crate_version!())
        .arg(
            Arg::with_name("shape")
                .long("shape")
                .short("s")
                .value_name("SHAPE")
                .possible_values(&["circle", "ellipse", "superellipse"])
                .help("The shape of the pitch curve\n")
                .default_value("ellipse"),
        )
        .arg(
            Arg::with_name("teeth")
                .long("teeth")
                .short("t")
                .value_name("COUNT")
                .help(
                    "Number of teeth on the pitch curve;\n\
                      a circle gets half as many, with gaps between them",
                )
                .default_value("40"),
        )
        .arg(
            Arg::with_name("slices")
                .long("slices")
                .short("S")
                .value_name("COUNT")
                .help("Number of points along each side of a tooth")
                .default_value("10"),
        )
        .arg(
            Arg::with_name("radius")
                .long("radius")
                .short("r")
                .value_name("LENGTH")
                .help("Radius of a circle")
                .default_value("1.0"),
        )
        .arg(
            Arg::with_name("a")
                .short("a")
                .value_name("LENGTH")
                .help("Semi-major axis of an ellipse, or X semi-axis of a superellipse")
                .default_value("1.0"),
        )
        .arg(
            Arg::with_name("b")
                .short("b")
                .value_name("LENGTH")
                .help("Y semi-axis of a superellipse")
                .default_value("0.8"),
        )
        .arg(
            Arg::with_name("eccentricity")
                .long("eccentricity")
                .short("e")
                .value_name("FRACTION")
                .help("Eccentricity of an ellipse, in [0, 1)")
                .default_value("0.15"),
        )
        .arg(
            Arg::with_name("nodes")
                .long("nodes")
                .short("n")
                .value_name("COUNT")
                .help("Number of times an ellipse repeats per turn")
                .default_value("2"),
        )
        .arg(
            Arg::with_name("exponent")
                .long("exponent")
                .short("x")
                .value_name("POWER")
                .help("Exponent of a superellipse, at least 2")
                .default_value("2.5"),
        )
        .arg(
            Arg::with_name("inner-radius")
                .long("inner-radius")
                .short("i")
                .value_name("LENGTH")
                .help("Bore radius of the gear; zero for no bore")
                .default_value("0.0625"),
        )
        .arg(
            Arg::with_name("period")
                .long("period")
                .short("p")
                .value_name("COUNT")
                .help(
                    "Number of turns of the gear\n\
                      for one turn of the conjugate gear",
                )
                .default_value("2"),
        )
        .arg(
            Arg::with_name("center-distance")
                .long("center-distance")
                .short("c")
                .value_name("LENGTH")
                .help("Initial guess of the distance between the gear axes")
                .default_value("3.0"),
        )
        .arg(
            Arg::with_name("conjugate-inner-radius")
                .long("conjugate-inner-radius")
                .short("I")
                .value_name("LENGTH")
                .help("Bore radius of the conjugate gear; zero for no bore")
                .default_value("0.0625"),
        )
        .arg(
            Arg::with_name("depth")
                .long("depth")
                .short("d")
                .value_name("LENGTH")
                .help("Extrusion depth (thickness of DXF lines)")
                .default_value("0.2"),
        )
        .arg(
            Arg::with_name("tolerance")
                .long("tolerance")
                .short("T")
                .value_name("FRACTION")
                .help(
                    "Angular sampling step of the pitch curve,\n\
                      and base of all the convergence tolerances",
                )
                .default_value("0.001"),
        )
        .arg(
            Arg::with_name("single")
                .long("single")
                .help("Generate only the gear, without its conjugate"),
        )
        .arg(
            Arg::with_name("offset")
                .long("offset")
                .conflicts_with("single")
                .help(
                    "Pair the gear with a copy of itself whose teeth are\n\
                     shifted by half a pitch, instead of searching for a conjugate",
                ),
        )
        .arg(
            Arg::with_name("format")
                .long("format")
                .short("f")
                .value_name("FORMAT")
                .possible_values(&["svg", "dxf"])
                .help("Format of the output file")
                .default_value("svg"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .short("o")
                .value_name("FILE")
                .help("File to write the output into;\nspecify \"-\" for STDOUT")
                .default_value("-"),
        )
        .arg(
            Arg::with_name("x-scale")
                .long("x-scale")
                .short("X")
                .value_name("SCALE")
                .help(
                    "Scaling of the output SVG, one of:\n\
                       \"<size>pt\" / \"x<factor>\" / \"same\" as y-scale\n",
                )
                .default_value("x100"),
        )
        .arg(
            Arg::with_name("y-scale")
                .long("y-scale")
                .short("Y")
                .value_name("SCALE")
                .help(
                    "Scaling of the output SVG, one of:\n\
                       \"<size>pt\" / \"x<factor>\" / \"same\" as x-scale\n",
                )
                .default_value("same"),
        )
}

fn arg_options(arg_matches: &ArgMatches) -> Result<Options> {
    let options = Options {
        teeth_count: parse_count(arg_matches, "teeth")?,
        tooth_slices: parse_count(arg_matches, "slices")?,
        depth: parse_value(arg_matches, "depth")?,
        tolerance: parse_fraction(arg_matches, "tolerance")?,
        period_factor: parse_count(arg_matches, "period")?,
        ..Options::default()
    };
    options.validate()?;
    Ok(options)
}

fn parse_curve(arg_matches: &ArgMatches) -> Result<PitchCurve> {
    let inner_radius = parse_value(arg_matches, "inner-radius")?;
    match arg_matches.value_of("shape").unwrap_or("ellipse") {
        "circle" => PitchCurve::circle(parse_value(arg_matches, "radius")?, inner_radius),
        "ellipse" => PitchCurve::ellipse(
            parse_value(arg_matches, "a")?,
            parse_value(arg_matches, "eccentricity")?,
            parse_count(arg_matches, "nodes")?,
            inner_radius,
        ),
        "superellipse" => PitchCurve::superellipse(
            parse_value(arg_matches, "a")?,
            parse_value(arg_matches, "b")?,
            parse_value(arg_matches, "exponent")?,
            inner_radius,
        ),
        shape => Err(GearsError::invalid("shape", shape)), // NOT TESTED
    }
}

fn value_of<'a>(arg_matches: &'a ArgMatches, name: &'static str) -> Result<&'a str> {
    arg_matches
        .value_of(name)
        .ok_or_else(|| GearsError::invalid(name, "missing"))
}

fn parse_count(arg_matches: &ArgMatches, name: &'static str) -> Result<usize> {
    let value = value_of(arg_matches, name)?;
    let count = value
        .parse::<usize>()
        .map_err(|error| GearsError::invalid(name, format!("{}: {}", error, value)))?;
    if count == 0 {
        return Err(GearsError::invalid(name, "zero")); // NOT TESTED
    }
    Ok(count)
}

fn parse_fraction(arg_matches: &ArgMatches, name: &'static str) -> Result<f64> {
    let value = parse_value(arg_matches, name)?;
    if value <= 0.0 {
        // BEGIN NOT TESTED
        return Err(GearsError::invalid(
            name,
            format!("{} is not positive", value),
        ));
        // END NOT TESTED
    }
    Ok(value)
}

fn parse_value(arg_matches: &ArgMatches, name: &'static str) -> Result<f64> {
    let value = value_of(arg_matches, name)?;
    value
        .parse::<f64>()
        .map_err(|error| GearsError::invalid(name, format!("{}: {}", error, value)))
}

fn parse_scale(arg_matches: &ArgMatches, name: &'static str) -> Result<Scale> {
    let value = value_of(arg_matches, name)?;
    let parse = |number: &str| {
        number
            .parse::<f64>()
            .map_err(|error| GearsError::invalid(name, format!("{}: {}", error, value)))
    };
    match value {
        "same" => Ok(Scale::Same),
        value if value.starts_with('x') => Ok(Scale::Factor(parse(&value[1..])?)),
        value if value.ends_with("pt") => Ok(Scale::Size(parse(&value[..(value.len() - 2)])?)),
        value => Err(GearsError::invalid(name, value)), // NOT TESTED
    }
}

fn write_outlines(
    arg_matches: &ArgMatches,
    outlines: &[GearOutline],
    output: &mut dyn Write,
) -> Result<()> {
    match arg_matches.value_of("format").unwrap_or("svg") {
        "dxf" => write_dxf_outlines(outlines, output),
        _ => print_svg_outlines(
            outlines,
            parse_scale(arg_matches, "x-scale")?,
            parse_scale(arg_matches, "y-scale")?,
            output,
        ),
    }
}

#[cfg(test)]
#[test]
fn test_parse_scale() {
    let matches = app().get_matches_from(vec!["test", "-X", "100pt", "-Y", "x2.5"]);
    assert!(parse_scale(&matches, "x-scale").unwrap() == Scale::Size(100.0));
    assert!(parse_scale(&matches, "y-scale").unwrap() == Scale::Factor(2.5));

    let defaults = app().get_matches_from(vec!["test"]);
    assert!(parse_scale(&defaults, "y-scale").unwrap() == Scale::Same);
    let options = arg_options(&defaults).unwrap();
    assert!(options.teeth_count == 40);
    assert!(options.period_factor == 2);

    let invalid = app().get_matches_from(vec!["test", "-X", "x1.5.0"]);
    assert!(matches!(
        parse_scale(&invalid, "x-scale"),
        Err(GearsError::InvalidParameter { .. })
    ));
}
