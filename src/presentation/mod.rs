// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取端点的HTTP表示层
pub mod handlers;
pub mod routes;
