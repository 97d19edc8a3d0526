//! YOLO形式の出力テンソルをデコードする
//!
//! 出力は `[1, 4 + クラス数, アンカー数]`（チャネル先頭）か、
//! その転置 `[1, アンカー数, 4 + クラス数]`。各アンカーの先頭4値は
//! モデル入力ピクセルでの中心+サイズ。

use endo_lens_common::{to_top_left_size, BoxConvention, FallbackDetection, Size};

/// しきい値を超えた1候補（モデル入力ピクセル、中心+サイズ）
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub center_box: [f32; 4],
    pub class_id: usize,
    pub score: f32,
}

impl Candidate {
    fn corners(&self) -> [f32; 4] {
        let [cx, cy, w, h] = self.center_box;
        [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
    }

    fn area(&self) -> f32 {
        self.center_box[2].max(0.0) * self.center_box[3].max(0.0)
    }

    pub fn iou(&self, other: &Candidate) -> f32 {
        let [ax1, ay1, ax2, ay2] = self.corners();
        let [bx1, by1, bx2, by2] = other.corners();
        let w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let intersection = w * h;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// 出力テンソルからしきい値以上の候補を取り出す
///
/// `shape` は `[1, a, b]` を想定。特徴量の軸は長さが `4 + num_classes` の方で、
/// どちらの軸も一致しなければ `Err`。両方一致する場合はチャネル先頭とみなす。
pub fn decode_output(
    data: &[f32],
    shape: &[usize],
    num_classes: usize,
    score_threshold: f32,
) -> Result<Vec<Candidate>, String> {
    let (rows, cols) = match shape {
        [1, rows, cols] => (*rows, *cols),
        _ => return Err(format!("unexpected output shape {:?}", shape)),
    };
    if data.len() != rows * cols {
        return Err(format!("output length {} does not match shape {:?}", data.len(), shape));
    }
    if num_classes == 0 {
        return Err("no class labels configured".to_string());
    }

    let features = 4 + num_classes;
    let channels_first = if rows == features {
        true
    } else if cols == features {
        false
    } else {
        return Err(format!(
            "output shape {:?} has no axis of {} features ({} classes)",
            shape, features, num_classes
        ));
    };
    let anchors = if channels_first { cols } else { rows };

    let value = |feature: usize, anchor: usize| -> f32 {
        if channels_first {
            data[feature * anchors + anchor]
        } else {
            data[anchor * features + feature]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (4..features)
            .map(|f| (f - 4, value(f, anchor)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score.is_finite() && score >= score_threshold {
            candidates.push(Candidate {
                center_box: [value(0, anchor), value(1, anchor), value(2, anchor), value(3, anchor)],
                class_id,
                score,
            });
        }
    }
    Ok(candidates)
}

/// クラスごとの貪欲NMS（スコア降順）
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// 候補を元画像ピクセルの左上+サイズ検出へ変換
pub fn to_fallback_detections(
    candidates: &[Candidate],
    labels: &[String],
    input_size: u32,
    original: Size,
) -> Vec<FallbackDetection> {
    let scale_x = original.width / input_size as f64;
    let scale_y = original.height / input_size as f64;

    candidates
        .iter()
        .map(|c| {
            let raw = c.center_box.map(f64::from);
            let [x, y, w, h] = to_top_left_size(raw, BoxConvention::CenterSize);
            let class_name = labels
                .get(c.class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", c.class_id));
            FallbackDetection {
                bbox: [x * scale_x, y * scale_y, w * scale_x, h * scale_y],
                class_name,
                score: f64::from(c.score),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(center_box: [f32; 4], class_id: usize, score: f32) -> Candidate {
        Candidate { center_box, class_id, score }
    }

    #[test]
    fn test_decode_channels_first() {
        // 2クラス x 3アンカー: 行 = cx, cy, w, h, c0, c1
        #[rustfmt::skip]
        let data = vec![
            10.0, 50.0, 90.0,
            10.0, 50.0, 90.0,
             4.0,  8.0, 12.0,
             4.0,  8.0, 12.0,
             0.9,  0.1,  0.2,
             0.1,  0.8,  0.3,
        ];
        let out = decode_output(&data, &[1, 6, 3], 2, 0.5).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], candidate([10.0, 10.0, 4.0, 4.0], 0, 0.9));
        assert_eq!(out[1], candidate([50.0, 50.0, 8.0, 8.0], 1, 0.8));
    }

    #[test]
    fn test_decode_transposed() {
        // 8アンカー x 5特徴量（1クラス）
        let mut data = vec![0.0; 8 * 5];
        data[3 * 5..4 * 5].copy_from_slice(&[20.0, 30.0, 6.0, 6.0, 0.7]);
        let out = decode_output(&data, &[1, 8, 5], 1, 0.25).unwrap();
        assert_eq!(out, vec![candidate([20.0, 30.0, 6.0, 6.0], 0, 0.7)]);
    }

    #[test]
    fn test_decode_transposed_with_few_anchors() {
        // 3アンカー x 6特徴量（2クラス）: アンカー数が特徴量数より少ない
        #[rustfmt::skip]
        let data = vec![
            10.0, 10.0,  4.0,  4.0, 0.9, 0.1,
            50.0, 50.0,  8.0,  8.0, 0.1, 0.8,
            90.0, 90.0, 12.0, 12.0, 0.2, 0.3,
        ];
        let out = decode_output(&data, &[1, 3, 6], 2, 0.5).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], candidate([10.0, 10.0, 4.0, 4.0], 0, 0.9));
        assert_eq!(out[1], candidate([50.0, 50.0, 8.0, 8.0], 1, 0.8));
    }

    #[test]
    fn test_decode_single_anchor_channels_first() {
        // [1, 4 + 4クラス, 1]
        let data = vec![30.0, 40.0, 10.0, 20.0, 0.1, 0.2, 0.3, 0.95];
        let out = decode_output(&data, &[1, 8, 1], 4, 0.25).unwrap();
        assert_eq!(out, vec![candidate([30.0, 40.0, 10.0, 20.0], 3, 0.95)]);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[0.0; 6], &[6], 1, 0.5).is_err());
        assert!(decode_output(&[0.0; 5], &[1, 2, 3], 1, 0.5).is_err());
        assert!(decode_output(&[0.0; 6], &[1, 3, 2], 1, 0.5).is_err());
        assert!(decode_output(&[0.0; 12], &[1, 4, 3], 0, 0.5).is_err());
    }

    #[test]
    fn test_nms_per_class() {
        let a = candidate([50.0, 50.0, 20.0, 20.0], 0, 0.9);
        let b = candidate([52.0, 50.0, 20.0, 20.0], 0, 0.6);
        let c = candidate([51.0, 50.0, 20.0, 20.0], 1, 0.5);
        let d = candidate([150.0, 150.0, 20.0, 20.0], 0, 0.4);

        let kept = non_max_suppression(vec![b.clone(), d.clone(), a.clone(), c.clone()], 0.45);
        assert_eq!(kept, vec![a, c, d]);
    }

    #[test]
    fn test_iou() {
        let a = candidate([10.0, 10.0, 10.0, 10.0], 0, 1.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        let far = candidate([100.0, 100.0, 10.0, 10.0], 0, 1.0);
        assert_eq!(a.iou(&far), 0.0);
        let empty = candidate([0.0, 0.0, 0.0, 0.0], 0, 1.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn test_to_fallback_detections_scales_to_original() {
        let labels = vec!["No Endodontic Treatment".to_string(), "Total Endodontic Failure".to_string()];
        let candidates = vec![
            candidate([320.0, 320.0, 64.0, 32.0], 1, 0.8),
            candidate([100.0, 100.0, 10.0, 10.0], 7, 0.3),
        ];
        let out = to_fallback_detections(&candidates, &labels, 640, Size::new(1280.0, 640.0));

        assert_eq!(out[0].class_name, "Total Endodontic Failure");
        assert_eq!(out[0].bbox, [576.0, 304.0, 128.0, 32.0]);
        assert!((out[0].score - 0.8).abs() < 1e-6);
        assert_eq!(out[1].class_name, "class_7");
    }
}
