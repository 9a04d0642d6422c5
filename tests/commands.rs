//! End-to-end command runs against in-memory documents.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use spiralgen::document::{Node, Paint, RectangleNode, ScaleMode};
use spiralgen::{Config, Document, MemoryDocument, ParameterBag, Plugin, StaticFetcher, Status};

const IMAGE_URL: &str = "https://picsum.photos/256";
const REQUEST_URL: &str = "https://httpbin.org/get?success=true";

fn png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn plugin_with(fetcher: StaticFetcher) -> Plugin<MemoryDocument, StaticFetcher> {
    Plugin::new(MemoryDocument::new(), fetcher, Config::default())
}

#[tokio::test]
async fn fetch_and_render_writes_pretty_json() {
    let body = r#"{"args":{"success":"true"},"url":"https://httpbin.org/get?success=true"}"#;
    let mut plugin = plugin_with(StaticFetcher::new().with(REQUEST_URL, body));
    let params = ParameterBag::from_pairs([("requestUrl", REQUEST_URL)]);

    let outcome = plugin.run("network-request", Some(&params)).await;
    assert_eq!(outcome.message, "Completed network-request.");

    let doc = plugin.document();
    let text = doc.nodes().iter().find_map(Node::as_text).unwrap();
    insta::assert_snapshot!(text.characters.as_str(), @r#"
    {
      "args": {
        "success": "true"
      },
      "url": "https://httpbin.org/get?success=true"
    }
    "#);
}

#[tokio::test]
async fn fetch_and_render_requires_a_url() {
    let mut plugin = plugin_with(StaticFetcher::new());
    let outcome = plugin.run("fetch-and-render", Some(&ParameterBag::new())).await;
    assert_eq!(outcome.status, Status::Aborted);
    assert_eq!(outcome.message, "Request URL parameter is required");
}

#[tokio::test]
async fn place_image_needs_both_dimensions_to_override() {
    let fetcher = StaticFetcher::new().with(IMAGE_URL, png(4, 3, [0, 0, 0, 255]));
    let mut plugin = plugin_with(fetcher);

    // width alone is ignored in favour of the intrinsic size
    let params = ParameterBag::from_pairs([("imageUrl", IMAGE_URL), ("width", "300")]);
    assert!(plugin.run("add-image", Some(&params)).await.is_success());

    let params = ParameterBag::from_pairs([
        ("imageUrl", IMAGE_URL),
        ("width", "300"),
        ("height", "200"),
    ]);
    assert!(plugin.run("place-image", Some(&params)).await.is_success());

    let sizes: Vec<(f64, f64)> = plugin
        .document()
        .nodes()
        .iter()
        .filter_map(Node::as_rectangle)
        .map(|r| (r.width, r.height))
        .collect();
    assert_eq!(sizes, vec![(4.0, 3.0), (300.0, 200.0)]);
}

#[tokio::test]
async fn place_image_dimension_messages() {
    let fetcher = StaticFetcher::new().with(IMAGE_URL, png(4, 3, [0, 0, 0, 255]));
    let mut plugin = plugin_with(fetcher);

    let cases = [
        (("5000", "abc"), "Width and height must not be more than 4096 pixels"),
        (("abc", "100"), "Width and height must be numbers"),
    ];
    for ((width, height), message) in cases {
        let params = ParameterBag::from_pairs([
            ("imageUrl", IMAGE_URL),
            ("width", width),
            ("height", height),
        ]);
        let outcome = plugin.run("place-image", Some(&params)).await;
        assert_eq!(outcome.status, Status::Aborted);
        assert_eq!(outcome.message, message);
    }
    assert!(plugin.document().nodes().is_empty());
}

#[tokio::test]
async fn invert_runs_over_the_selection_and_reuses_the_sandbox() {
    let mut doc = MemoryDocument::new();
    let hash = doc.create_image(png(2, 2, [255, 0, 0, 255]));
    let photo = doc.add_rectangle(
        "photo",
        RectangleNode {
            fills: vec![Paint::Image {
                image_hash: Some(hash),
                scale_mode: ScaleMode::Fit,
            }],
            ..RectangleNode::default()
        },
    );
    let frame = doc.add_frame("frame");
    doc.set_selection(vec![frame, photo]);
    let mut plugin = Plugin::new(doc, StaticFetcher::new(), Config::default());

    for _ in 0..2 {
        let outcome = plugin.run("invert-image-colors", None).await;
        assert!(outcome.is_success(), "{outcome:?}");
    }

    // inverting twice restores the original pixels
    let doc = plugin.document();
    let rect = doc.node(photo).and_then(Node::as_rectangle).unwrap();
    let Paint::Image { image_hash: Some(hash), .. } = &rect.fills[0] else {
        panic!("expected an image fill");
    };
    let pixels = image::load_from_memory(doc.image(hash).unwrap())
        .unwrap()
        .to_rgba8();
    assert_eq!(pixels.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
}

#[tokio::test]
async fn every_run_closes_exactly_once() {
    let mut plugin = plugin_with(StaticFetcher::new());
    let runs = [
        ("generate-shapes", vec![("count", "4")]),
        ("generate-shapes", vec![]),
        ("place-image", vec![("imageUrl", "https://example.com/nothing.png")]),
        ("test-variables", vec![]),
    ];
    let outcomes: Vec<String> = {
        let mut out = Vec::new();
        for (command, pairs) in runs {
            let params = ParameterBag::from_pairs(pairs);
            let outcome = plugin.run(command, Some(&params)).await;
            out.push(serde_json::to_string(&outcome).unwrap());
        }
        out
    };
    insta::assert_snapshot!(outcomes.join("\n"), @r#"
    {"command":"generate-shapes","status":"completed","message":"Completed generate-shapes."}
    {"command":"generate-shapes","status":"aborted","message":"Count parameter is required"}
    {"command":"place-image","status":"failed","message":"The command place-image failed. Check the console for more info."}
    {"command":"test-variables","status":"aborted","message":"Unknown command"}
    "#);
}
