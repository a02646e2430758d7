//! Cluster-robust (Liang-Zeger) covariance for OLS coefficients.

use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;

/// Sandwich covariance `(X'X)^-1 B (X'X)^-1` with `B = sum_g X_g' e_g e_g' X_g`.
///
/// Rows sharing a label in `cluster_ids` form one cluster. The small-sample
/// factor `G/(G-1) * (n-1)/(n-p)` is applied. Returns the covariance and the
/// number of clusters `G`.
pub fn cluster_robust_covariance(
    x: &DMatrix<f64>,
    residuals: &DVector<f64>,
    xtx_inv: &DMatrix<f64>,
    cluster_ids: &[f64],
) -> Result<(DMatrix<f64>, usize)> {
    let n = x.nrows();
    let p = x.ncols();

    if cluster_ids.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: cluster_ids.len(),
        });
    }
    if cluster_ids.iter().any(|c| !c.is_finite()) {
        return Err(Error::Numerical(
            "Cluster labels must be finite".to_string(),
        ));
    }

    // Ordered by label so the summation order is deterministic.
    let mut clusters: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, &cid) in cluster_ids.iter().enumerate() {
        clusters.entry(cid.to_bits()).or_default().push(i);
    }
    let g = clusters.len();
    if g < 2 {
        return Err(Error::InsufficientData(format!(
            "Cluster-robust covariance needs at least 2 clusters, got {}",
            g
        )));
    }

    let mut meat = DMatrix::<f64>::zeros(p, p);
    let mut score = DVector::<f64>::zeros(p);
    for rows in clusters.values() {
        score.fill(0.0);
        for &i in rows {
            score.axpy(residuals[i], &x.row(i).transpose(), 1.0);
        }
        meat.ger(1.0, &score, &score, 1.0);
    }

    let (g_f, n_f, p_f) = (g as f64, n as f64, p as f64);
    let correction = (g_f / (g_f - 1.0)) * ((n_f - 1.0) / (n_f - p_f));
    let cov = (xtx_inv * meat * xtx_inv) * correction;

    Ok((cov, g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ModelFrame, ModelSpec};
    use crate::model::lm::{fit_ols, Covariance};
    use approx::assert_relative_eq;

    #[test]
    fn test_singleton_clusters_scale_hc0() {
        // With one row per cluster the sandwich is HC0 times n/(n-1) * (n-1)/(n-p).
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
        let e = DVector::from_vec(vec![0.5, -1.0, -0.5, 1.0]);
        let xtx_inv = (x.transpose() * &x).try_inverse().unwrap();

        let (cov, g) =
            cluster_robust_covariance(&x, &e, &xtx_inv, &[0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(g, 4);

        let mut meat = DMatrix::<f64>::zeros(2, 2);
        for i in 0..4 {
            let xi = x.row(i).transpose();
            meat += &xi * xi.transpose() * e[i].powi(2);
        }
        let hc0 = &xtx_inv * meat * &xtx_inv;
        let factor = (4.0 / 3.0) * (3.0 / 2.0);
        for a in 0..2 {
            for b in 0..2 {
                assert_relative_eq!(cov[(a, b)], hc0[(a, b)] * factor, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_single_cluster_rejected() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        let e = DVector::from_vec(vec![0.1, -0.2, 0.1]);
        let xtx_inv = DMatrix::from_element(1, 1, 1.0 / 3.0);
        let err = cluster_robust_covariance(&x, &e, &xtx_inv, &[7.0, 7.0, 7.0]).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_clustered_fit_reports_cluster_df() {
        let frame = ModelFrame::new(8)
            .with_column(Column::IsTreatment, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0])
            .unwrap()
            .with_column(Column::Time, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
            .unwrap()
            .with_column(Column::SubjectId, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0])
            .unwrap()
            .with_column(Column::Target, vec![1.0, 1.4, 2.0, 4.1, 0.8, 1.1, 2.3, 4.6])
            .unwrap();
        let spec = ModelSpec::new(Column::Target).crossed(Column::Time, Column::IsTreatment);

        let clustered =
            fit_ols(&frame, &spec, Covariance::Cluster(Column::SubjectId)).unwrap();
        let iid = fit_ols(&frame, &spec, Covariance::Iid).unwrap();

        assert_eq!(clustered.n_clusters, Some(4));
        assert_eq!(clustered.df, 3.0);
        assert_eq!(iid.df, 4.0);
        assert_eq!(clustered.covariance, Covariance::Cluster(Column::SubjectId));
        for (a, b) in clustered.coefficients.iter().zip(&iid.coefficients) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        assert!(clustered.std_errors.iter().all(|se| se.is_finite()));
    }
}
